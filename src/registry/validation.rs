// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Whole-catalog validation.
//!
//! Resolution only inspects the closure of what was requested. This checks
//! every registered module at once so a broken catalog is caught at startup:
//!
//! 1. **Reference validation**: every declared dependency is registered
//! 2. **Cycle detection**: Kahn's algorithm over the full catalog
//!
//! Cycle detection runs only when every reference resolves.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::PlanError;
use crate::registry::{DependencyGraph, ModuleDescriptor};

pub fn validate_catalog(
    modules: &BTreeMap<String, Arc<ModuleDescriptor>>,
) -> Result<(), Vec<PlanError>> {
    let mut errors = Vec::new();

    if let Err(unresolved) = validate_dependency_references(modules) {
        errors.extend(unresolved);
    }

    if errors.is_empty() {
        if let Err(cycle) = validate_acyclic(modules) {
            errors.push(cycle);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dependency_references(
    modules: &BTreeMap<String, Arc<ModuleDescriptor>>,
) -> Result<(), Vec<PlanError>> {
    let errors: Vec<PlanError> = modules
        .values()
        .flat_map(|descriptor| {
            descriptor
                .dependencies
                .iter()
                .filter(|dependency| !modules.contains_key(*dependency))
                .map(|dependency| PlanError::UnknownModule {
                    module: dependency.clone(),
                    required_by: Some(descriptor.name.clone()),
                })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_acyclic(modules: &BTreeMap<String, Arc<ModuleDescriptor>>) -> Result<(), PlanError> {
    DependencyGraph::from_descriptors(modules.values().map(Arc::as_ref))
        .topological_order()
        .map(|_| ())
        .map_err(|members| PlanError::CycleDetected { members })
}

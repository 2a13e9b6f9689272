// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::registry::{DependencyGraph, ModuleDescriptor};

/// A resolved, ordered set of modules ready to execute.
///
/// `order` is a topological order of the dependency closure of the requested
/// modules. Every module in the plan has all of its dependencies in the plan.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    requested: BTreeSet<String>,
    order: Vec<String>,
    modules: BTreeMap<String, Arc<ModuleDescriptor>>,
    added_by: BTreeMap<String, String>,
}

impl ExecutionPlan {
    pub(crate) fn new(
        requested: BTreeSet<String>,
        order: Vec<String>,
        modules: BTreeMap<String, Arc<ModuleDescriptor>>,
        added_by: BTreeMap<String, String>,
    ) -> Self {
        Self {
            requested,
            order,
            modules,
            added_by,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn position(&self, module: &str) -> Option<usize> {
        self.order.iter().position(|m| m == module)
    }

    pub fn descriptor(&self, module: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(module)
    }

    pub fn dependencies_of(&self, module: &str) -> impl Iterator<Item = &String> {
        self.modules
            .get(module)
            .into_iter()
            .flat_map(|descriptor| descriptor.dependencies.iter())
    }

    pub fn requested(&self) -> &BTreeSet<String> {
        &self.requested
    }

    /// Modules pulled in only as dependencies, each mapped to the first
    /// module found to require it.
    pub fn added_as_dependencies(&self) -> &BTreeMap<String, String> {
        &self.added_by
    }

    /// Modules grouped into levels that could run side by side.
    pub fn levels(&self) -> Vec<Vec<String>> {
        DependencyGraph::from_descriptors(self.modules.values().map(Arc::as_ref)).levels()
    }
}

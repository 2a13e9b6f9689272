// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module catalog and dependency resolution.

mod dependency_graph;
mod descriptor;
mod plan;
mod validation;

pub use dependency_graph::DependencyGraph;
pub use descriptor::{DeterminismTier, ModuleCategory, ModuleDescriptor};
pub use plan::ExecutionPlan;
pub use validation::validate_catalog;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::errors::PlanError;
use crate::observability::messages::registry::{DependenciesAdded, PlanResolved};
use crate::observability::messages::StructuredLog;

/// Catalog of every known analysis module, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<ModuleDescriptor>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. Names must be unique.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<(), PlanError> {
        if self.modules.contains_key(&descriptor.name) {
            return Err(PlanError::DuplicateModule {
                module: descriptor.name,
            });
        }
        debug!(module = %descriptor.name, "Registered module");
        self.modules
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModuleDescriptor>> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.modules.keys()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<ModuleDescriptor>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Check every registered module's dependencies resolve and form no cycle.
    pub fn validate(&self) -> Result<(), Vec<PlanError>> {
        validate_catalog(&self.modules)
    }

    /// Expand `requested` to its dependency closure and order it.
    ///
    /// Duplicate requests collapse. Fails before anything executes if a name
    /// is unknown or the closure contains a cycle.
    pub fn resolve<I, S>(&self, requested: I) -> Result<ExecutionPlan, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> = requested
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();

        let mut closure: BTreeMap<String, Arc<ModuleDescriptor>> = BTreeMap::new();
        let mut added_by: BTreeMap<String, String> = BTreeMap::new();
        let mut pending: Vec<(String, Option<String>)> =
            requested.iter().rev().map(|name| (name.clone(), None)).collect();

        while let Some((name, required_by)) = pending.pop() {
            if closure.contains_key(&name) {
                continue;
            }
            let descriptor = self
                .modules
                .get(&name)
                .ok_or_else(|| PlanError::UnknownModule {
                    module: name.clone(),
                    required_by: required_by.clone(),
                })?;

            if let Some(parent) = required_by {
                if !requested.contains(&name) {
                    added_by.entry(name.clone()).or_insert(parent);
                }
            }

            for dependency in descriptor.dependencies.iter().rev() {
                if !closure.contains_key(dependency) {
                    pending.push((dependency.clone(), Some(name.clone())));
                }
            }
            closure.insert(name, Arc::clone(descriptor));
        }

        let order = DependencyGraph::from_descriptors(closure.values().map(Arc::as_ref))
            .topological_order()
            .map_err(|members| PlanError::CycleDetected { members })?;

        for (module, parent) in &added_by {
            DependenciesAdded {
                module,
                required_by: parent,
            }
            .log();
        }
        PlanResolved {
            requested: requested.len(),
            total: order.len(),
        }
        .log();

        Ok(ExecutionPlan::new(requested, order, closure, added_by))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubModule;

    fn descriptor(name: &'static str, dependencies: &[&str]) -> ModuleDescriptor {
        ModuleDescriptor::new(name, Arc::new(StubModule::new(name)))
            .with_dependencies(dependencies.iter().copied())
    }

    /// A slice of the analysis catalog with realistic dependency shapes.
    fn catalog() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for d in [
            descriptor("stats", &[]),
            descriptor("sentiment", &[]),
            descriptor("ner", &[]),
            descriptor("emotion", &[]),
            descriptor("acts", &[]),
            descriptor("pauses", &[]),
            descriptor("entity_sentiment", &["ner", "sentiment"]),
            descriptor("contagion", &["emotion"]),
            descriptor("qa_analysis", &["acts"]),
            descriptor("momentum", &["pauses"]),
            descriptor("moments", &["momentum"]),
        ] {
            registry.register(d).unwrap();
        }
        registry
    }

    #[test]
    fn test_resolve_pulls_in_missing_dependencies() {
        let plan = catalog()
            .resolve(["stats", "sentiment", "entity_sentiment"])
            .unwrap();

        assert_eq!(
            plan.order(),
            ["ner", "sentiment", "entity_sentiment", "stats"]
        );
        assert_eq!(
            plan.added_as_dependencies().get("ner").map(String::as_str),
            Some("entity_sentiment")
        );
        assert!(!plan.added_as_dependencies().contains_key("sentiment"));
    }

    #[test]
    fn test_resolve_transitive_chain() {
        let plan = catalog().resolve(["moments"]).unwrap();
        assert_eq!(plan.order(), ["pauses", "momentum", "moments"]);
        assert_eq!(plan.added_as_dependencies().len(), 2);
    }

    #[test]
    fn test_resolve_is_order_and_duplicate_insensitive() {
        let registry = catalog();
        let a = registry.resolve(["qa_analysis", "contagion", "stats"]).unwrap();
        let b = registry
            .resolve(["stats", "contagion", "qa_analysis", "stats"])
            .unwrap();

        assert_eq!(a.order(), b.order());
        assert_eq!(
            a.order(),
            ["acts", "emotion", "contagion", "qa_analysis", "stats"]
        );
    }

    #[test]
    fn test_every_dependency_precedes_its_dependent() {
        let registry = catalog();
        let all: Vec<String> = registry.names().cloned().collect();
        let plan = registry.resolve(&all).unwrap();

        for module in plan.order() {
            let position = plan.position(module).unwrap();
            for dependency in plan.dependencies_of(module) {
                assert!(plan.position(dependency).unwrap() < position);
            }
        }
        assert_eq!(plan.len(), registry.len());
    }

    #[test]
    fn test_unknown_requested_module() {
        let error = catalog().resolve(["stats", "nonexistent"]).unwrap_err();
        assert_eq!(
            error,
            PlanError::UnknownModule {
                module: "nonexistent".to_string(),
                required_by: None,
            }
        );
    }

    #[test]
    fn test_unknown_dependency_names_declaring_module() {
        let mut registry = ModuleRegistry::new();
        registry
            .register(descriptor("summary", &["highlights"]))
            .unwrap();

        let error = registry.resolve(["summary"]).unwrap_err();
        assert_eq!(
            error,
            PlanError::UnknownModule {
                module: "highlights".to_string(),
                required_by: Some("summary".to_string()),
            }
        );
    }

    #[test]
    fn test_cycle_is_rejected_with_members() {
        let mut registry = ModuleRegistry::new();
        registry.register(descriptor("a", &["b"])).unwrap();
        registry.register(descriptor("b", &["a"])).unwrap();
        registry.register(descriptor("c", &["a"])).unwrap();

        let error = registry.resolve(["c"]).unwrap_err();
        assert_eq!(
            error,
            PlanError::CycleDetected {
                members: vec!["a".to_string(), "b".to_string()],
            }
        );
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = catalog();
        let error = registry.register(descriptor("stats", &[])).unwrap_err();
        assert_eq!(
            error,
            PlanError::DuplicateModule {
                module: "stats".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_reports_every_unknown_reference() {
        let mut registry = ModuleRegistry::new();
        registry.register(descriptor("x", &["missing_1"])).unwrap();
        registry.register(descriptor("y", &["missing_2"])).unwrap();

        assert_eq!(registry.validate().unwrap_err().len(), 2);
        assert!(catalog().validate().is_ok());
    }

    #[test]
    fn test_empty_request_resolves_to_empty_plan() {
        let plan = catalog().resolve(Vec::<String>::new()).unwrap();
        assert!(plan.is_empty());
    }
}

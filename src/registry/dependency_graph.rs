// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::registry::ModuleDescriptor;

/// Newtype wrapper for a module dependency graph.
///
/// Maps each module to the modules that depend on it (its dependents).
/// Ordered collections keep every traversal deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph(pub BTreeMap<String, BTreeSet<String>>);

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the graph for a set of descriptors
    pub fn from_descriptors<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a ModuleDescriptor>,
    {
        let mut graph = Self::new();
        for descriptor in descriptors {
            graph.add_module(descriptor.name.clone());
            for dependency in &descriptor.dependencies {
                graph.add_dependency(dependency, &descriptor.name);
            }
        }
        graph
    }

    /// Add a module with no edges (no-op if already present)
    pub fn add_module(&mut self, module: impl Into<String>) {
        self.0.entry(module.into()).or_default();
    }

    /// Record that `dependent` depends on `dependency`
    pub fn add_dependency(&mut self, dependency: &str, dependent: &str) {
        self.add_module(dependent);
        self.0
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// Get dependents for a module
    pub fn get_dependents(&self, module: &str) -> Option<&BTreeSet<String>> {
        self.0.get(module)
    }

    /// Get all module names in the graph
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Invert the graph: module -> the modules it depends on
    pub fn build_reverse_dependencies(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut reverse: BTreeMap<String, BTreeSet<String>> =
            self.0.keys().map(|k| (k.clone(), BTreeSet::new())).collect();
        for (dependency, dependents) in &self.0 {
            for dependent in dependents {
                reverse
                    .entry(dependent.clone())
                    .or_default()
                    .insert(dependency.clone());
            }
        }
        reverse
    }

    /// Kahn's algorithm with a lexicographically ordered ready set.
    ///
    /// Among modules whose dependencies are all placed, the smallest name is
    /// always placed next, so the order is a pure function of the graph.
    /// On a cycle, returns the sorted names of every module on a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        let reverse = self.build_reverse_dependencies();
        let mut in_degree: BTreeMap<&str, usize> = reverse
            .iter()
            .map(|(module, dependencies)| (module.as_str(), dependencies.len()))
            .collect();
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(module, _)| *module)
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(next) = ready.pop_first() {
            order.push(next.to_string());
            if let Some(dependents) = self.0.get(next) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(dependent.as_str());
                        }
                    }
                }
            }
        }

        if order.len() == in_degree.len() {
            return Ok(order);
        }

        let unplaced: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(module, _)| *module)
            .collect();
        Err(self.cycle_members(&unplaced))
    }

    /// Modules in `candidates` that can reach themselves without leaving
    /// `candidates`. Modules that merely sit downstream of a cycle are dropped.
    fn cycle_members(&self, candidates: &BTreeSet<&str>) -> Vec<String> {
        candidates
            .iter()
            .filter(|start| {
                let mut seen = BTreeSet::new();
                let mut queue: VecDeque<&str> = VecDeque::from([**start]);
                while let Some(current) = queue.pop_front() {
                    let Some(dependents) = self.0.get(current) else {
                        continue;
                    };
                    for dependent in dependents {
                        let dependent = dependent.as_str();
                        if dependent == **start {
                            return true;
                        }
                        if candidates.contains(dependent) && seen.insert(dependent) {
                            queue.push_back(dependent);
                        }
                    }
                }
                false
            })
            .map(|module| module.to_string())
            .collect()
    }

    /// Group modules into levels: every module's dependencies sit in earlier
    /// levels, and each level is sorted. Modules on a cycle are left out.
    pub fn levels(&self) -> Vec<Vec<String>> {
        let reverse = self.build_reverse_dependencies();
        let mut in_degree: BTreeMap<&str, usize> = reverse
            .iter()
            .map(|(module, dependencies)| (module.as_str(), dependencies.len()))
            .collect();
        let mut current: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(module, _)| *module)
            .collect();

        let mut levels = Vec::new();
        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for module in &current {
                if let Some(dependents) = self.0.get(*module) {
                    for dependent in dependents {
                        if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                            *degree -= 1;
                            if *degree == 0 {
                                next.insert(dependent.as_str());
                            }
                        }
                    }
                }
            }
            levels.push(current.iter().map(|m| m.to_string()).collect());
            current = next.into_iter().collect();
        }
        levels
    }
}

impl From<BTreeMap<String, BTreeSet<String>>> for DependencyGraph {
    fn from(graph: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self(graph)
    }
}

impl From<DependencyGraph> for BTreeMap<String, BTreeSet<String>> {
    fn from(graph: DependencyGraph) -> Self {
        graph.0
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::traits::AnalysisModule;

/// Rough cost class of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleCategory {
    Light,
    Medium,
    Heavy,
}

/// How reproducible a module's output is.
///
/// `T0` is fully deterministic, `T1` deterministic up to a fixed seed or
/// model version. `T2` output varies between runs and is never reused from
/// the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeterminismTier {
    T0,
    T1,
    T2,
}

impl DeterminismTier {
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, DeterminismTier::T2)
    }
}

/// Static metadata for one analysis module plus the module itself.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub description: String,
    pub category: ModuleCategory,
    pub dependencies: BTreeSet<String>,
    pub determinism_tier: DeterminismTier,
    pub version: String,
    pub entry_point: Arc<dyn AnalysisModule>,
}

impl ModuleDescriptor {
    /// A light, deterministic, version "1" module with no dependencies.
    pub fn new(name: impl Into<String>, entry_point: Arc<dyn AnalysisModule>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: ModuleCategory::Light,
            dependencies: BTreeSet::new(),
            determinism_tier: DeterminismTier::T0,
            version: "1".to_string(),
            entry_point,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: ModuleCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tier(mut self, tier: DeterminismTier) -> Self {
        self.determinism_tier = tier;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.determinism_tier.is_cacheable()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("dependencies", &self.dependencies)
            .field("determinism_tier", &self.determinism_tier)
            .field("version", &self.version)
            .field("entry_point", &self.entry_point.name())
            .finish()
    }
}

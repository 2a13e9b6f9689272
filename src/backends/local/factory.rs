// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::modules::*;
use crate::errors::PlanError;
use crate::registry::{DeterminismTier, ModuleCategory, ModuleDescriptor, ModuleRegistry};
use crate::traits::AnalysisModule;

/// Builds the modules that ship with the crate.
pub struct LocalModuleFactory;

impl LocalModuleFactory {
    pub fn create_module(name: &str) -> Result<Arc<dyn AnalysisModule>, String> {
        match name {
            "stats" => Ok(Arc::new(StatsModule)),
            "word_frequency" => Ok(Arc::new(WordFrequencyModule)),
            "transcript_output" => Ok(Arc::new(TranscriptOutputModule)),
            "summary" => Ok(Arc::new(SummaryModule)),
            _ => Err(format!("Unknown local module implementation: '{}'", name)),
        }
    }

    pub fn list_available_implementations() -> Vec<&'static str> {
        vec!["stats", "summary", "transcript_output", "word_frequency"]
    }

    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }

    /// Descriptors for every built-in module.
    pub fn descriptors() -> Vec<ModuleDescriptor> {
        vec![
            ModuleDescriptor::new("stats", Arc::new(StatsModule))
                .with_description("Segment, word and speaking-time counts per speaker")
                .with_category(ModuleCategory::Light)
                .with_tier(DeterminismTier::T0),
            ModuleDescriptor::new("word_frequency", Arc::new(WordFrequencyModule))
                .with_description("Token frequencies across the transcript")
                .with_category(ModuleCategory::Light)
                .with_tier(DeterminismTier::T0),
            ModuleDescriptor::new("transcript_output", Arc::new(TranscriptOutputModule))
                .with_description("Readable transcript with speaker names and timestamps")
                .with_category(ModuleCategory::Light)
                .with_tier(DeterminismTier::T0),
            ModuleDescriptor::new("summary", Arc::new(SummaryModule))
                .with_description("Overview combining stats and word frequencies")
                .with_category(ModuleCategory::Light)
                .with_tier(DeterminismTier::T0)
                .with_dependencies(["stats", "word_frequency"]),
        ]
    }

    /// A registry holding every built-in module.
    pub fn builtin_registry() -> Result<ModuleRegistry, PlanError> {
        let mut registry = ModuleRegistry::new();
        for descriptor in Self::descriptors() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }
}

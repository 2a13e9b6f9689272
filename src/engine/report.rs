// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::errors::ModuleError;

/// Outcome of executing a plan.
///
/// A run with errors still reports everything that did complete. Every module
/// of the plan appears in exactly one of `modules_run`, `modules_reused` or
/// `errors`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Set by the pipeline runner once the run is persisted
    pub pipeline_run_id: Option<i64>,
    /// The plan's topological order
    pub execution_order: Vec<String>,
    /// Modules that executed and succeeded, in completion order
    pub modules_run: Vec<String>,
    /// Modules satisfied from an earlier run
    pub modules_reused: Vec<String>,
    pub errors: Vec<ModuleError>,
    pub duration: Duration,
}

impl RunReport {
    pub fn new(execution_order: Vec<String>) -> Self {
        Self {
            execution_order,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether `module` ran or was reused.
    pub fn completed(&self, module: &str) -> bool {
        self.modules_run.iter().any(|m| m == module) || self.was_reused(module)
    }

    pub fn was_reused(&self, module: &str) -> bool {
        self.modules_reused.iter().any(|m| m == module)
    }

    pub fn error_for(&self, module: &str) -> Option<&ModuleError> {
        self.errors.iter().find(|e| e.module == module)
    }

    pub fn deadlocked(&self) -> impl Iterator<Item = &ModuleError> {
        self.errors.iter().filter(|e| e.is_deadlock())
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// Why a single module did not complete during a run.
///
/// Module errors are collected into the run report; they never abort the
/// rest of the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleErrorKind {
    /// The module returned a failure or panicked
    #[error("execution failed: {message}")]
    Execution { message: String },

    /// The module could never become ready because a dependency did not complete
    #[error("dependencies never completed: {}", unmet.join(", "))]
    DependencyDeadlock { unmet: Vec<String> },

    /// Bookkeeping around the module (cache lookup, run record, artifact
    /// registration) failed
    #[error("bookkeeping failed: {message}")]
    Persistence { message: String },
}

/// A module name paired with the reason it did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleError {
    pub module: String,
    pub kind: ModuleErrorKind,
}

impl ModuleError {
    pub fn new(module: impl Into<String>, kind: ModuleErrorKind) -> Self {
        Self {
            module: module.into(),
            kind,
        }
    }

    pub fn execution(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            module,
            ModuleErrorKind::Execution {
                message: message.into(),
            },
        )
    }

    pub fn is_deadlock(&self) -> bool {
        matches!(self.kind, ModuleErrorKind::DependencyDeadlock { .. })
    }
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module, self.kind)
    }
}

impl std::error::Error for ModuleError {}

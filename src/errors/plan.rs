// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Errors that can occur while resolving requested modules into an execution plan.
///
/// These surface before any module runs or any database row is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A module (requested directly or declared as a dependency) is not registered
    UnknownModule {
        /// The name that could not be found
        module: String,
        /// The module that declared it as a dependency, `None` for direct requests
        required_by: Option<String>,
    },
    /// The dependency closure contains a cycle
    CycleDetected {
        /// Every module that lies on a cycle, sorted by name
        members: Vec<String>,
    },
    /// A module name was registered twice
    DuplicateModule {
        /// The duplicate module name
        module: String,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnknownModule {
                module,
                required_by: Some(parent),
            } => {
                write!(
                    f,
                    "Module '{}' depends on '{}' which is not registered",
                    parent, module
                )
            }
            PlanError::UnknownModule {
                module,
                required_by: None,
            } => {
                write!(f, "Unknown module: '{}'", module)
            }
            PlanError::CycleDetected { members } => {
                write!(
                    f,
                    "Cyclic dependency detected among modules: {}",
                    members.join(", ")
                )
            }
            PlanError::DuplicateModule { module } => {
                write!(f, "Duplicate module name: '{}'", module)
            }
        }
    }
}

impl std::error::Error for PlanError {}

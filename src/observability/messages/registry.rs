// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for module resolution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A module was added to the plan because another module depends on it.
///
/// # Log Level
/// `info!` - Operators should see what ran beyond their request
pub struct DependenciesAdded<'a> {
    pub module: &'a str,
    pub required_by: &'a str,
}

impl Display for DependenciesAdded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Added module '{}' as a dependency of '{}'",
            self.module, self.required_by
        )
    }
}

impl StructuredLog for DependenciesAdded<'_> {
    fn log(&self) {
        tracing::info!(
            module = self.module,
            required_by = self.required_by,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dependency_added",
            span_name = name,
            module = self.module,
            required_by = self.required_by,
        )
    }
}

/// Resolution finished.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct PlanResolved {
    pub requested: usize,
    pub total: usize,
}

impl Display for PlanResolved {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved {} requested modules into a plan of {}",
            self.requested, self.total
        )
    }
}

impl StructuredLog for PlanResolved {
    fn log(&self) {
        tracing::debug!(requested = self.requested, total = self.total, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "plan_resolved",
            span_name = name,
            requested = self.requested,
            total = self.total,
        )
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the artifact index and its validator.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A module run's artifacts were indexed.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ArtifactsRegistered<'a> {
    pub module: &'a str,
    pub module_run_id: i64,
    pub count: usize,
}

impl Display for ArtifactsRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered {} artifacts for '{}' (module run {})",
            self.count, self.module, self.module_run_id
        )
    }
}

impl StructuredLog for ArtifactsRegistered<'_> {
    fn log(&self) {
        tracing::debug!(
            module = self.module,
            module_run_id = self.module_run_id,
            count = self.count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "artifacts_registered",
            span_name = name,
            module = self.module,
            module_run_id = self.module_run_id,
        )
    }
}

/// Validation of a transcript's artifacts finished.
///
/// # Log Level
/// `info!` when clean, `warn!` when any finding was reported
pub struct ValidationCompleted<'a> {
    pub transcript: &'a str,
    pub checked_records: usize,
    pub checked_files: usize,
    pub p0: usize,
    pub p1: usize,
    pub warnings: usize,
}

impl Display for ValidationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validated '{}': {} records, {} files, {} P0, {} P1, {} warnings",
            self.transcript,
            self.checked_records,
            self.checked_files,
            self.p0,
            self.p1,
            self.warnings
        )
    }
}

impl StructuredLog for ValidationCompleted<'_> {
    fn log(&self) {
        if self.p0 + self.p1 + self.warnings == 0 {
            tracing::info!(
                transcript = self.transcript,
                checked_records = self.checked_records,
                checked_files = self.checked_files,
                "{}", self
            );
        } else {
            tracing::warn!(
                transcript = self.transcript,
                p0 = self.p0,
                p1 = self.p1,
                warnings = self.warnings,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "artifact_validation",
            span_name = name,
            transcript = self.transcript,
        )
    }
}

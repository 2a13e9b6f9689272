// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for executor lifecycle and per-module events.
//!
//! This module contains message types for logging events related to:
//! * Run start and completion
//! * Module start, completion, failure and reuse
//! * Modules that could never become ready

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Execution started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use transcript_pipeline::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     module_count: 5,
///     max_workers: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ExecutionStarted {
    pub module_count: usize,
    pub max_workers: usize,
}

impl Display for ExecutionStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting execution: {} modules, max_workers={}",
            self.module_count, self.max_workers
        )
    }
}

impl StructuredLog for ExecutionStarted {
    fn log(&self) {
        tracing::info!(
            module_count = self.module_count,
            max_workers = self.max_workers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            module_count = self.module_count,
            max_workers = self.max_workers,
        )
    }
}

/// Execution finished (successfully or with module errors).
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted {
    pub modules_run: usize,
    pub modules_reused: usize,
    pub errors: usize,
    pub duration: Duration,
}

impl Display for ExecutionCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Execution completed in {:?}: {} run, {} reused, {} errors",
            self.duration, self.modules_run, self.modules_reused, self.errors
        )
    }
}

impl StructuredLog for ExecutionCompleted {
    fn log(&self) {
        tracing::info!(
            modules_run = self.modules_run,
            modules_reused = self.modules_reused,
            errors = self.errors,
            duration = ?self.duration,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            modules_run = self.modules_run,
            modules_reused = self.modules_reused,
            errors = self.errors,
            duration = ?self.duration,
        )
    }
}

/// A module was handed to a worker.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ModuleStarted<'a> {
    pub module: &'a str,
}

impl Display for ModuleStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting module '{}'", self.module)
    }
}

impl StructuredLog for ModuleStarted<'_> {
    fn log(&self) {
        tracing::debug!(module = self.module, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("module", span_name = name, module = self.module)
    }
}

/// A module finished successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModuleCompleted<'a> {
    pub module: &'a str,
    pub duration: Duration,
}

impl Display for ModuleCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' completed in {:?}", self.module, self.duration)
    }
}

impl StructuredLog for ModuleCompleted<'_> {
    fn log(&self) {
        tracing::info!(module = self.module, duration = ?self.duration, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "module_completed",
            span_name = name,
            module = self.module,
            duration = ?self.duration,
        )
    }
}

/// A module failed, panicked, or its bookkeeping failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ModuleFailed<'a> {
    pub module: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ModuleFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' failed: {}", self.module, self.error)
    }
}

impl StructuredLog for ModuleFailed<'_> {
    fn log(&self) {
        tracing::error!(module = self.module, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "module_failed",
            span_name = name,
            module = self.module,
            error = %self.error,
        )
    }
}

/// A module was satisfied from an earlier run instead of executing.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModuleReused<'a> {
    pub module: &'a str,
}

impl Display for ModuleReused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Module '{}' reused from cache", self.module)
    }
}

impl StructuredLog for ModuleReused<'_> {
    fn log(&self) {
        tracing::info!(module = self.module, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("module_reused", span_name = name, module = self.module)
    }
}

/// A module never became ready because dependencies did not complete.
///
/// # Log Level
/// `warn!` - Consequence of an earlier failure
pub struct ModuleDeadlocked<'a> {
    pub module: &'a str,
    pub unmet: &'a [String],
}

impl Display for ModuleDeadlocked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module '{}' skipped: dependencies never completed: {}",
            self.module,
            self.unmet.join(", ")
        )
    }
}

impl StructuredLog for ModuleDeadlocked<'_> {
    fn log(&self) {
        tracing::warn!(module = self.module, unmet = ?self.unmet, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "module_deadlocked",
            span_name = name,
            module = self.module,
            unmet = ?self.unmet,
        )
    }
}

/// A pipeline run reached its terminal status.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineRunFinished<'a> {
    pub pipeline_run_id: i64,
    pub status: &'a str,
    pub duration: Duration,
}

impl Display for PipelineRunFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline run {} finished as {} in {:?}",
            self.pipeline_run_id, self.status, self.duration
        )
    }
}

impl StructuredLog for PipelineRunFinished<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline_run_id = self.pipeline_run_id,
            status = self.status,
            duration = ?self.duration,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            pipeline_run_id = self.pipeline_run_id,
            status = self.status,
        )
    }
}

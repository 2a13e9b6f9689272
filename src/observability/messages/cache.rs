// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for module cache decisions.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An authoritative run was found for the module's inputs.
///
/// # Log Level
/// `info!` - Important operational event
pub struct CacheHit<'a> {
    pub module: &'a str,
    pub module_run_id: i64,
}

impl Display for CacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cache hit for '{}': reusing module run {}",
            self.module, self.module_run_id
        )
    }
}

impl StructuredLog for CacheHit<'_> {
    fn log(&self) {
        tracing::info!(
            module = self.module,
            module_run_id = self.module_run_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "cache_hit",
            span_name = name,
            module = self.module,
            module_run_id = self.module_run_id,
        )
    }
}

/// No reusable run exists.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct CacheMiss<'a> {
    pub module: &'a str,
    pub input_hash: &'a str,
}

impl Display for CacheMiss<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cache miss for '{}' (input {})", self.module, self.input_hash)
    }
}

impl StructuredLog for CacheMiss<'_> {
    fn log(&self) {
        tracing::debug!(module = self.module, input_hash = self.input_hash, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "cache_miss",
            span_name = name,
            module = self.module,
            input_hash = self.input_hash,
        )
    }
}

/// The cache was not consulted for a module.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct CacheBypassed<'a> {
    pub module: &'a str,
    pub reason: &'a str,
}

impl Display for CacheBypassed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cache bypassed for '{}': {}", self.module, self.reason)
    }
}

impl StructuredLog for CacheBypassed<'_> {
    fn log(&self) {
        tracing::debug!(module = self.module, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "cache_bypassed",
            span_name = name,
            module = self.module,
            reason = self.reason,
        )
    }
}

/// A cached run was found but one of its primary artifacts is gone.
///
/// # Log Level
/// `warn!` - The module will be recomputed
pub struct CacheInvalidated<'a> {
    pub module: &'a str,
    pub module_run_id: i64,
    pub missing: &'a str,
}

impl Display for CacheInvalidated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring cached run {} for '{}': artifact {} is missing",
            self.module_run_id, self.module, self.missing
        )
    }
}

impl StructuredLog for CacheInvalidated<'_> {
    fn log(&self) {
        tracing::warn!(
            module = self.module,
            module_run_id = self.module_run_id,
            missing = self.missing,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "cache_invalidated",
            span_name = name,
            module = self.module,
            module_run_id = self.module_run_id,
        )
    }
}

/// Completing a run superseded earlier runs with the same cache key.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct RunsSuperseded<'a> {
    pub module: &'a str,
    pub module_run_id: i64,
    pub superseded: u64,
}

impl Display for RunsSuperseded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Module run {} for '{}' superseded {} earlier runs",
            self.module_run_id, self.module, self.superseded
        )
    }
}

impl StructuredLog for RunsSuperseded<'_> {
    fn log(&self) {
        tracing::debug!(
            module = self.module,
            module_run_id = self.module_run_id,
            superseded = self.superseded,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "runs_superseded",
            span_name = name,
            module = self.module,
            module_run_id = self.module_run_id,
        )
    }
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it with structured fields at its fixed level.
//!
//! # Organization
//!
//! * `registry` - resolution of requested modules into a plan
//! * `engine` - executor lifecycle and per-module outcomes
//! * `cache` - module cache decisions
//! * `artifacts` - artifact index and validation

pub mod artifacts;
pub mod cache;
pub mod engine;
pub mod registry;

use tracing::Span;

/// Emit a message as a structured event, or open a span carrying its fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus structured fields, so log text lives in one place per
//! event instead of being scattered through the code.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::registry` - module resolution events
//! * `messages::engine` - executor lifecycle and per-module events
//! * `messages::cache` - cache hits, misses, invalidation and supersession
//! * `messages::artifacts` - artifact registration and validation
//!
//! # Usage
//!
//! ```rust
//! use transcript_pipeline::observability::messages::engine::ModuleStarted;
//! use transcript_pipeline::observability::messages::StructuredLog;
//!
//! ModuleStarted { module: "stats" }.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (for example
/// `"info"`) applies. Calling this twice is harmless.
pub fn init_tracing(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

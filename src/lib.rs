// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod artifacts;     // artifact index + validator
pub mod backends;      // analysis module implementations
pub mod cache;         // content-addressed module cache
pub mod config;        // pipeline configuration
pub mod context;       // shared per-run state
pub mod engine;        // parallel executor
pub mod errors;        // error handling
pub mod observability;
pub mod pipeline;      // end-to-end runs
pub mod registry;      // module catalog + dependency resolution
pub mod store;         // SQLite run store
pub mod traits;        // unified abstractions
pub mod transcript;    // transcript loading

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-addressed reuse of module results.
//!
//! The authoritative-row key is `(transcript, module name, input hash)`. The
//! input hash is a pure function of the transcript content, the module's
//! configuration and the output hashes of its direct dependencies, see
//! [`hashing::InputHasher`]. At most one completed, cacheable run per key is
//! authoritative; newer completions supersede older ones without deleting
//! them. The module version only filters the lookup, so a version bump misses
//! the cache and its completion supersedes the previous version's run.

pub mod hashing;
mod module_cache;

pub use module_cache::{CachedResult, ModuleCache};

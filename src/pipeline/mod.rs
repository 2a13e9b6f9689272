// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end pipeline runs: plan, load, execute with cache-aware
//! bookkeeping, and record the outcome.

mod recorder;
mod runner;

pub use runner::{resolve_request, PipelineRunner};

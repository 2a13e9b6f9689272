// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod plan;
mod store;
mod transcript;

pub use config::ConfigError;
pub use execution::{ModuleError, ModuleErrorKind};
pub use plan::PlanError;
pub use store::{StoreError, StoreResult};
pub use transcript::TranscriptError;

use thiserror::Error;

/// Errors that abort a whole pipeline run.
///
/// Per-module failures are not represented here; they are collected in the
/// run report instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

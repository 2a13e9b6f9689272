// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod models;
mod run_store;
pub mod schema;

pub use models::{
    ArtifactProvenance, ArtifactRecord, ArtifactRole, CacheReason, ModuleRun, NewArtifactRecord,
    NewModuleRun, PipelineRun, RunStatus, TranscriptRecord,
};
pub use run_store::RunStore;

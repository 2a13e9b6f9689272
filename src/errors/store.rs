// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised by the run store, the module cache and the artifact registry.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Artifact key '{artifact_key}' is already registered for module run {module_run_id}")]
    DuplicateArtifactKey {
        module_run_id: i64,
        artifact_key: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        from: String,
        to: String,
    },

    #[error("Cannot read artifact '{artifact_key}': {source}")]
    ArtifactUnreadable {
        artifact_key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact path '{0}' must be relative to the artifact root")]
    PathOutsideRoot(String),

    #[error("Unrecognized {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

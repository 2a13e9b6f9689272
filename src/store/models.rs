// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Row types for the run store.

use crate::errors::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle status shared by pipeline runs and module runs.
///
/// Runs are created `InProgress` and move exactly once to `Completed` or
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> StoreResult<Self> {
        match value {
            "in_progress" => Ok(RunStatus::InProgress),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(StoreError::InvalidValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an artifact is a final deliverable or scratch output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    Primary,
    Intermediate,
}

impl ArtifactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::Primary => "primary",
            ArtifactRole::Intermediate => "intermediate",
        }
    }

    pub fn parse(value: &str) -> StoreResult<Self> {
        match value {
            "primary" => Ok(ArtifactRole::Primary),
            "intermediate" => Ok(ArtifactRole::Intermediate),
            other => Err(StoreError::InvalidValue {
                field: "artifact_role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a module run row carries `is_cacheable = false` or was not computed fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheReason {
    /// The row records reuse of an earlier run
    CacheHit,
    /// The module's output is not reproducible
    NonDeterministic,
    /// The cache was bypassed by configuration
    ForcedRerun,
}

impl CacheReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheReason::CacheHit => "cache_hit",
            CacheReason::NonDeterministic => "non_deterministic",
            CacheReason::ForcedRerun => "forced_rerun",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub id: i64,
    pub file_path: String,
    pub content_hash: String,
    pub base_name: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            file_path: row.try_get("file_path")?,
            content_hash: row.try_get("content_hash")?,
            base_name: row.try_get("base_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One execution of the pipeline against one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    pub id: i64,
    pub transcript_id: i64,
    pub pipeline_version: String,
    pub config_hash: String,
    pub input_hash: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineRun {
    pub(crate) fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            transcript_id: row.try_get("transcript_id")?,
            pipeline_version: row.try_get("pipeline_version")?,
            config_hash: row.try_get("config_hash")?,
            input_hash: row.try_get("input_hash")?,
            status: RunStatus::parse(&status)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// One execution, or one recorded reuse, of a module within a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRun {
    pub id: i64,
    pub pipeline_run_id: i64,
    pub transcript_id: i64,
    pub module_name: String,
    pub module_version: String,
    pub module_config_hash: String,
    pub module_input_hash: String,
    pub status: RunStatus,
    pub output_hash: Option<String>,
    pub is_cacheable: bool,
    pub cache_reason: Option<String>,
    pub reused_module_run_id: Option<i64>,
    pub outputs_json: Option<String>,
    pub duration_ms: Option<i64>,
    pub superseded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleRun {
    pub(crate) fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            pipeline_run_id: row.try_get("pipeline_run_id")?,
            transcript_id: row.try_get("transcript_id")?,
            module_name: row.try_get("module_name")?,
            module_version: row.try_get("module_version")?,
            module_config_hash: row.try_get("module_config_hash")?,
            module_input_hash: row.try_get("module_input_hash")?,
            status: RunStatus::parse(&status)?,
            output_hash: row.try_get("output_hash")?,
            is_cacheable: row.try_get("is_cacheable")?,
            cache_reason: row.try_get("cache_reason")?,
            reused_module_run_id: row.try_get("reused_module_run_id")?,
            outputs_json: row.try_get("outputs_json")?,
            duration_ms: row.try_get("duration_ms")?,
            superseded_at: row.try_get("superseded_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// The stored result payload, if one was recorded and still parses.
    pub fn outputs(&self) -> Option<Value> {
        self.outputs_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }

    /// Completed, cacheable and not superseded.
    pub fn is_authoritative(&self) -> bool {
        self.status == RunStatus::Completed && self.is_cacheable && self.superseded_at.is_none()
    }

    pub fn is_cache_hit(&self) -> bool {
        self.cache_reason.as_deref() == Some(CacheReason::CacheHit.as_str())
    }
}

/// Values for a module run row that is about to start.
#[derive(Debug, Clone)]
pub struct NewModuleRun<'a> {
    pub pipeline_run_id: i64,
    pub transcript_id: i64,
    pub module_name: &'a str,
    pub module_version: &'a str,
    pub module_config_hash: &'a str,
    pub module_input_hash: &'a str,
    pub is_cacheable: bool,
    pub cache_reason: Option<CacheReason>,
}

/// An output file of a module run, indexed by content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub id: i64,
    pub module_run_id: i64,
    pub transcript_id: i64,
    pub artifact_key: String,
    pub relative_path: String,
    pub artifact_root: String,
    pub artifact_type: Option<String>,
    pub artifact_role: ArtifactRole,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    pub(crate) fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let role: String = row.try_get("artifact_role")?;
        Ok(Self {
            id: row.try_get("id")?,
            module_run_id: row.try_get("module_run_id")?,
            transcript_id: row.try_get("transcript_id")?,
            artifact_key: row.try_get("artifact_key")?,
            relative_path: row.try_get("relative_path")?,
            artifact_root: row.try_get("artifact_root")?,
            artifact_type: row.try_get("artifact_type")?,
            artifact_role: ArtifactRole::parse(&role)?,
            content_hash: row.try_get("content_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub fn absolute_path(&self) -> PathBuf {
        PathBuf::from(&self.artifact_root).join(&self.relative_path)
    }
}

/// Values for an artifact row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewArtifactRecord {
    pub module_run_id: i64,
    pub transcript_id: i64,
    pub artifact_key: String,
    pub relative_path: String,
    pub artifact_root: String,
    pub artifact_type: Option<String>,
    pub artifact_role: ArtifactRole,
    pub content_hash: String,
}

/// An artifact row together with whether its provenance chain is intact.
#[derive(Debug, Clone)]
pub struct ArtifactProvenance {
    pub artifact: ArtifactRecord,
    pub module_run_exists: bool,
    pub pipeline_run_exists: bool,
}

impl ArtifactProvenance {
    pub fn is_intact(&self) -> bool {
        self.module_run_exists && self.pipeline_run_exists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [RunStatus::InProgress, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(RunStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(RunStatus::parse("paused").is_err());
    }

    #[test]
    fn test_only_in_progress_is_non_terminal() {
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(matches!(
            ArtifactRole::parse("final"),
            Err(StoreError::InvalidValue { field: "artifact_role", .. })
        ));
    }
}

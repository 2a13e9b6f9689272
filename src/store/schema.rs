// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Table definitions for the run store.
//!
//! Deleting a pipeline run cascades to its module runs, and deleting a module
//! run cascades to its artifacts. A cache-hit row only loses its reuse pointer
//! when the run it pointed at is deleted.

use crate::errors::StoreResult;
use sqlx::SqlitePool;
use tracing::debug;

const SCHEMA: &[&str] = &[
    "PRAGMA foreign_keys = ON",
    r#"
    CREATE TABLE IF NOT EXISTS transcripts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_path TEXT NOT NULL UNIQUE,
        content_hash TEXT NOT NULL,
        base_name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_transcripts_content_hash ON transcripts (content_hash)",
    r#"
    CREATE TABLE IF NOT EXISTS pipeline_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        transcript_id INTEGER NOT NULL REFERENCES transcripts (id) ON DELETE CASCADE,
        pipeline_version TEXT NOT NULL,
        config_hash TEXT NOT NULL,
        input_hash TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_transcript ON pipeline_runs (transcript_id)",
    r#"
    CREATE TABLE IF NOT EXISTS module_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pipeline_run_id INTEGER NOT NULL REFERENCES pipeline_runs (id) ON DELETE CASCADE,
        transcript_id INTEGER NOT NULL REFERENCES transcripts (id) ON DELETE CASCADE,
        module_name TEXT NOT NULL,
        module_version TEXT NOT NULL,
        module_config_hash TEXT NOT NULL,
        module_input_hash TEXT NOT NULL,
        status TEXT NOT NULL,
        output_hash TEXT,
        is_cacheable INTEGER NOT NULL DEFAULT 1,
        cache_reason TEXT,
        reused_module_run_id INTEGER REFERENCES module_runs (id) ON DELETE SET NULL,
        outputs_json TEXT,
        duration_ms INTEGER,
        superseded_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_module_runs_cache_key
        ON module_runs (transcript_id, module_name, module_input_hash)
    "#,
    "CREATE INDEX IF NOT EXISTS idx_module_runs_pipeline ON module_runs (pipeline_run_id)",
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS uq_module_runs_authoritative
        ON module_runs (transcript_id, module_name, module_input_hash)
        WHERE status = 'completed' AND is_cacheable = 1 AND superseded_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS artifacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        module_run_id INTEGER NOT NULL REFERENCES module_runs (id) ON DELETE CASCADE,
        transcript_id INTEGER NOT NULL REFERENCES transcripts (id) ON DELETE CASCADE,
        artifact_key TEXT NOT NULL,
        relative_path TEXT NOT NULL,
        artifact_root TEXT NOT NULL,
        artifact_type TEXT,
        artifact_role TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (module_run_id, artifact_key)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_artifacts_transcript ON artifacts (transcript_id)",
];

/// Create every table and index that does not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!(statements = SCHEMA.len(), "Run store schema ready");
    Ok(())
}

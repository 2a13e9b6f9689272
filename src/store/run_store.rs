// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! SQLite-backed persistence for transcripts, pipeline runs, module runs and
//! the artifact index.

use crate::errors::{StoreError, StoreResult};
use crate::store::models::{
    ArtifactProvenance, ArtifactRecord, CacheReason, ModuleRun, NewArtifactRecord, NewModuleRun,
    PipelineRun, RunStatus, TranscriptRecord,
};
use crate::store::schema::init_schema;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const MODULE_RUN_COLUMNS: &str = "id, pipeline_run_id, transcript_id, module_name, module_version, \
     module_config_hash, module_input_hash, status, output_hash, is_cacheable, cache_reason, \
     reused_module_run_id, outputs_json, duration_ms, superseded_at, created_at, updated_at";

/// Handle to the run store. Cloning is cheap; clones share one pool.
#[derive(Debug, Clone)]
pub struct RunStore {
    pool: SqlitePool,
}

impl RunStore {
    /// Open (creating if missing) the database at `database_url` and ensure
    /// the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        info!(database_url, "Connected to run store");
        Self::from_pool(pool).await
    }

    /// Fresh private in-memory store.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- transcripts -------------------------------------------------

    /// Insert a transcript or refresh the hash of an existing one at the same path.
    pub async fn upsert_transcript(
        &self,
        file_path: &str,
        content_hash: &str,
        base_name: &str,
    ) -> StoreResult<TranscriptRecord> {
        sqlx::query(
            r#"
            INSERT INTO transcripts (file_path, content_hash, base_name, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (file_path) DO UPDATE SET
                content_hash = excluded.content_hash,
                base_name = excluded.base_name
            "#,
        )
        .bind(file_path)
        .bind(content_hash)
        .bind(base_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM transcripts WHERE file_path = ?")
            .bind(file_path)
            .fetch_one(&self.pool)
            .await?;
        TranscriptRecord::from_row(&row)
    }

    pub async fn transcript_by_id(&self, id: i64) -> StoreResult<Option<TranscriptRecord>> {
        let row = sqlx::query("SELECT * FROM transcripts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(TranscriptRecord::from_row).transpose()
    }

    /// Most recently registered transcript with this content hash.
    pub async fn transcript_by_content_hash(
        &self,
        content_hash: &str,
    ) -> StoreResult<Option<TranscriptRecord>> {
        let row =
            sqlx::query("SELECT * FROM transcripts WHERE content_hash = ? ORDER BY id DESC LIMIT 1")
                .bind(content_hash)
                .fetch_optional(&self.pool)
                .await?;
        row.as_ref().map(TranscriptRecord::from_row).transpose()
    }

    pub async fn transcript_by_path(&self, file_path: &str) -> StoreResult<Option<TranscriptRecord>> {
        let row = sqlx::query("SELECT * FROM transcripts WHERE file_path = ?")
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(TranscriptRecord::from_row).transpose()
    }

    // ---- pipeline runs -----------------------------------------------

    pub async fn create_pipeline_run(
        &self,
        transcript_id: i64,
        pipeline_version: &str,
        config_hash: &str,
        input_hash: &str,
    ) -> StoreResult<PipelineRun> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO pipeline_runs
                (transcript_id, pipeline_version, config_hash, input_hash, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transcript_id)
        .bind(pipeline_version)
        .bind(config_hash)
        .bind(input_hash)
        .bind(RunStatus::InProgress.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(pipeline_run_id = id, transcript_id, "Created pipeline run");
        self.get_pipeline_run(id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "pipeline run",
                id,
            })
    }

    pub async fn get_pipeline_run(&self, id: i64) -> StoreResult<Option<PipelineRun>> {
        let row = sqlx::query("SELECT * FROM pipeline_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(PipelineRun::from_row).transpose()
    }

    pub async fn pipeline_runs_for_transcript(
        &self,
        transcript_id: i64,
    ) -> StoreResult<Vec<PipelineRun>> {
        let rows = sqlx::query("SELECT * FROM pipeline_runs WHERE transcript_id = ? ORDER BY id")
            .bind(transcript_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(PipelineRun::from_row).collect()
    }

    /// Move an in-progress pipeline run to a terminal status.
    pub async fn finish_pipeline_run(&self, id: i64, status: RunStatus) -> StoreResult<()> {
        if !status.is_terminal() {
            return Err(StoreError::InvalidTransition {
                entity: "pipeline run",
                id,
                from: RunStatus::InProgress.to_string(),
                to: status.to_string(),
            });
        }

        let result = sqlx::query(
            "UPDATE pipeline_runs SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(RunStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_pipeline_run(id).await? {
                None => Err(StoreError::NotFound {
                    entity: "pipeline run",
                    id,
                }),
                Some(run) => Err(StoreError::InvalidTransition {
                    entity: "pipeline run",
                    id,
                    from: run.status.to_string(),
                    to: status.to_string(),
                }),
            };
        }
        Ok(())
    }

    /// Delete a pipeline run along with its module runs and their artifact rows.
    /// Files on disk are left alone.
    pub async fn delete_pipeline_run(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pipeline_runs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Keep the `keep_latest` newest pipeline runs of a transcript and delete
    /// the rest. Returns the number of pipeline runs removed.
    pub async fn prune_pipeline_runs(
        &self,
        transcript_id: i64,
        keep_latest: usize,
    ) -> StoreResult<u64> {
        let keep = i64::try_from(keep_latest).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            DELETE FROM pipeline_runs
            WHERE transcript_id = ?
              AND id NOT IN (
                  SELECT id FROM pipeline_runs
                  WHERE transcript_id = ?
                  ORDER BY created_at DESC, id DESC
                  LIMIT ?
              )
            "#,
        )
        .bind(transcript_id)
        .bind(transcript_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        info!(transcript_id, keep_latest, removed, "Pruned pipeline runs");
        Ok(removed)
    }

    // ---- module runs -------------------------------------------------

    pub async fn create_module_run(&self, new_run: &NewModuleRun<'_>) -> StoreResult<ModuleRun> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO module_runs
                (pipeline_run_id, transcript_id, module_name, module_version, module_config_hash,
                 module_input_hash, status, is_cacheable, cache_reason, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_run.pipeline_run_id)
        .bind(new_run.transcript_id)
        .bind(new_run.module_name)
        .bind(new_run.module_version)
        .bind(new_run.module_config_hash)
        .bind(new_run.module_input_hash)
        .bind(RunStatus::InProgress.as_str())
        .bind(new_run.is_cacheable)
        .bind(new_run.cache_reason.map(|reason| reason.as_str()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require_module_run(result.last_insert_rowid()).await
    }

    pub async fn get_module_run(&self, id: i64) -> StoreResult<Option<ModuleRun>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM module_runs WHERE id = ?",
            MODULE_RUN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(ModuleRun::from_row).transpose()
    }

    async fn require_module_run(&self, id: i64) -> StoreResult<ModuleRun> {
        self.get_module_run(id).await?.ok_or(StoreError::NotFound {
            entity: "module run",
            id,
        })
    }

    pub async fn module_runs_for_pipeline(&self, pipeline_run_id: i64) -> StoreResult<Vec<ModuleRun>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM module_runs WHERE pipeline_run_id = ? ORDER BY id",
            MODULE_RUN_COLUMNS
        ))
        .bind(pipeline_run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(ModuleRun::from_row).collect()
    }

    /// Newest authoritative run for a cache key, if any.
    pub async fn find_cacheable_run(
        &self,
        transcript_id: i64,
        module_name: &str,
        module_version: &str,
        input_hash: &str,
    ) -> StoreResult<Option<ModuleRun>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM module_runs
            WHERE transcript_id = ?
              AND module_name = ?
              AND module_version = ?
              AND module_input_hash = ?
              AND status = ?
              AND is_cacheable = 1
              AND superseded_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
            MODULE_RUN_COLUMNS
        ))
        .bind(transcript_id)
        .bind(module_name)
        .bind(module_version)
        .bind(input_hash)
        .bind(RunStatus::Completed.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(ModuleRun::from_row).transpose()
    }

    /// Mark a module run completed with the given cacheability. When it is
    /// cacheable, every other authoritative run with the same cache key is
    /// superseded in the same transaction. Returns how many runs were
    /// superseded.
    pub async fn complete_module_run(
        &self,
        id: i64,
        output_hash: &str,
        outputs_json: Option<&str>,
        is_cacheable: bool,
        duration_ms: i64,
    ) -> StoreResult<u64> {
        self.complete_module_run_with_artifacts(
            id,
            output_hash,
            outputs_json,
            is_cacheable,
            duration_ms,
            &[],
        )
        .await
        .map(|(superseded, _)| superseded)
    }

    /// [`complete_module_run`](Self::complete_module_run) that also indexes
    /// the run's artifacts in the same transaction. Either the run is
    /// completed with every artifact row, or nothing is written.
    pub async fn complete_module_run_with_artifacts(
        &self,
        id: i64,
        output_hash: &str,
        outputs_json: Option<&str>,
        is_cacheable: bool,
        duration_ms: i64,
        artifacts: &[NewArtifactRecord],
    ) -> StoreResult<(u64, Vec<ArtifactRecord>)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM module_runs WHERE id = ?",
            MODULE_RUN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "module run",
            id,
        })?;
        let run = ModuleRun::from_row(&row)?;

        if run.status != RunStatus::InProgress {
            return Err(StoreError::InvalidTransition {
                entity: "module run",
                id,
                from: run.status.to_string(),
                to: RunStatus::Completed.to_string(),
            });
        }

        let mut records = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            records.push(insert_artifact_row(&mut tx, artifact).await?);
        }

        let mut superseded = 0;
        if is_cacheable {
            superseded = sqlx::query(
                r#"
                UPDATE module_runs
                SET superseded_at = ?, updated_at = ?
                WHERE transcript_id = ?
                  AND module_name = ?
                  AND module_input_hash = ?
                  AND status = ?
                  AND is_cacheable = 1
                  AND superseded_at IS NULL
                  AND id != ?
                "#,
            )
            .bind(now)
            .bind(now)
            .bind(run.transcript_id)
            .bind(&run.module_name)
            .bind(&run.module_input_hash)
            .bind(RunStatus::Completed.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query(
            r#"
            UPDATE module_runs
            SET status = ?, output_hash = ?, outputs_json = ?, is_cacheable = ?, duration_ms = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(RunStatus::Completed.as_str())
        .bind(output_hash)
        .bind(outputs_json)
        .bind(is_cacheable)
        .bind(duration_ms)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((superseded, records))
    }

    pub async fn fail_module_run(&self, id: i64, duration_ms: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE module_runs SET status = ?, duration_ms = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(RunStatus::Failed.as_str())
        .bind(duration_ms)
        .bind(Utc::now())
        .bind(id)
        .bind(RunStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let run = self.require_module_run(id).await?;
            return Err(StoreError::InvalidTransition {
                entity: "module run",
                id,
                from: run.status.to_string(),
                to: RunStatus::Failed.to_string(),
            });
        }
        Ok(())
    }

    /// Record that `cached` was reused by `pipeline_run_id`.
    ///
    /// The new row is completed, non-cacheable and points back at the reused
    /// run, so it never competes with it for the cache key.
    pub async fn record_cache_hit(
        &self,
        pipeline_run_id: i64,
        cached: &ModuleRun,
    ) -> StoreResult<ModuleRun> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO module_runs
                (pipeline_run_id, transcript_id, module_name, module_version, module_config_hash,
                 module_input_hash, status, output_hash, is_cacheable, cache_reason,
                 reused_module_run_id, outputs_json, duration_ms, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(pipeline_run_id)
        .bind(cached.transcript_id)
        .bind(&cached.module_name)
        .bind(&cached.module_version)
        .bind(&cached.module_config_hash)
        .bind(&cached.module_input_hash)
        .bind(RunStatus::Completed.as_str())
        .bind(&cached.output_hash)
        .bind(CacheReason::CacheHit.as_str())
        .bind(cached.id)
        .bind(&cached.outputs_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.require_module_run(result.last_insert_rowid()).await
    }

    // ---- artifacts ---------------------------------------------------

    pub async fn artifact_exists(&self, module_run_id: i64, artifact_key: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM artifacts WHERE module_run_id = ? AND artifact_key = ?)",
        )
        .bind(module_run_id)
        .bind(artifact_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn insert_artifact(&self, artifact: &NewArtifactRecord) -> StoreResult<ArtifactRecord> {
        let mut conn = self.pool.acquire().await?;
        insert_artifact_row(&mut conn, artifact).await
    }

    /// Index a batch of artifacts atomically: every row is inserted or none is.
    pub async fn insert_artifacts(
        &self,
        artifacts: &[NewArtifactRecord],
    ) -> StoreResult<Vec<ArtifactRecord>> {
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            records.push(insert_artifact_row(&mut tx, artifact).await?);
        }
        tx.commit().await?;
        Ok(records)
    }

    pub async fn artifacts_for_module_run(&self, module_run_id: i64) -> StoreResult<Vec<ArtifactRecord>> {
        let rows = sqlx::query("SELECT * FROM artifacts WHERE module_run_id = ? ORDER BY id")
            .bind(module_run_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(ArtifactRecord::from_row).collect()
    }

    /// Artifact rows of a transcript with the state of their provenance chain.
    ///
    /// With `pipeline_run_id`, only artifacts produced by that run, or by runs
    /// it reused from the cache, are returned.
    pub async fn artifact_provenance(
        &self,
        transcript_id: i64,
        pipeline_run_id: Option<i64>,
    ) -> StoreResult<Vec<ArtifactProvenance>> {
        let rows = sqlx::query(
            r#"
            SELECT a.*, m.id AS joined_module_run_id, p.id AS joined_pipeline_run_id
            FROM artifacts a
            LEFT JOIN module_runs m ON m.id = a.module_run_id
            LEFT JOIN pipeline_runs p ON p.id = m.pipeline_run_id
            WHERE a.transcript_id = ?
              AND (
                  ? IS NULL
                  OR m.pipeline_run_id = ?
                  OR m.id IN (
                      SELECT reused_module_run_id FROM module_runs
                      WHERE pipeline_run_id = ? AND reused_module_run_id IS NOT NULL
                  )
              )
            ORDER BY a.id
            "#,
        )
        .bind(transcript_id)
        .bind(pipeline_run_id)
        .bind(pipeline_run_id)
        .bind(pipeline_run_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let module_run: Option<i64> = row.try_get("joined_module_run_id")?;
                let pipeline_run: Option<i64> = row.try_get("joined_pipeline_run_id")?;
                Ok(ArtifactProvenance {
                    artifact: ArtifactRecord::from_row(row)?,
                    module_run_exists: module_run.is_some(),
                    pipeline_run_exists: pipeline_run.is_some(),
                })
            })
            .collect()
    }
}

/// Insert one artifact row on `conn`, which may be inside a transaction.
async fn insert_artifact_row(
    conn: &mut SqliteConnection,
    artifact: &NewArtifactRecord,
) -> StoreResult<ArtifactRecord> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM artifacts WHERE module_run_id = ? AND artifact_key = ?)",
    )
    .bind(artifact.module_run_id)
    .bind(&artifact.artifact_key)
    .fetch_one(&mut *conn)
    .await?;
    if exists {
        return Err(StoreError::DuplicateArtifactKey {
            module_run_id: artifact.module_run_id,
            artifact_key: artifact.artifact_key.clone(),
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO artifacts
            (module_run_id, transcript_id, artifact_key, relative_path, artifact_root,
             artifact_type, artifact_role, content_hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(artifact.module_run_id)
    .bind(artifact.transcript_id)
    .bind(&artifact.artifact_key)
    .bind(&artifact.relative_path)
    .bind(&artifact.artifact_root)
    .bind(&artifact.artifact_type)
    .bind(artifact.artifact_role.as_str())
    .bind(&artifact.content_hash)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|error| match error {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::DuplicateArtifactKey {
                module_run_id: artifact.module_run_id,
                artifact_key: artifact.artifact_key.clone(),
            }
        }
        other => StoreError::Database(other),
    })?;

    let row = sqlx::query("SELECT * FROM artifacts WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&mut *conn)
        .await?;
    ArtifactRecord::from_row(&row)
}

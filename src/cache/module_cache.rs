// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::time::Duration;

use crate::errors::StoreResult;
use crate::observability::messages::artifacts::ArtifactsRegistered;
use crate::observability::messages::cache::{
    CacheBypassed, CacheHit, CacheInvalidated, CacheMiss, RunsSuperseded,
};
use crate::observability::messages::StructuredLog;
use crate::store::{ArtifactRecord, ModuleRun, NewArtifactRecord, NewModuleRun, RunStore};

/// An authoritative module run that can stand in for a fresh execution.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub module_run: ModuleRun,
    pub artifacts: Vec<ArtifactRecord>,
}

impl CachedResult {
    pub fn module_run_id(&self) -> i64 {
        self.module_run.id
    }

    pub fn output_hash(&self) -> Option<&str> {
        self.module_run.output_hash.as_deref()
    }

    /// The payload the module produced when it ran.
    pub fn payload(&self) -> Option<Value> {
        self.module_run.outputs()
    }
}

/// Cache decisions and module run bookkeeping on top of the run store.
///
/// The cache never looks at determinism tiers. Callers decide whether a run
/// is cacheable and the cache records exactly that.
#[derive(Debug, Clone)]
pub struct ModuleCache {
    store: RunStore,
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl ModuleCache {
    pub fn new(store: RunStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Look up a reusable result. `None` means the module has to run.
    ///
    /// A run whose registered artifacts are no longer on disk is not reused.
    pub async fn should_run(
        &self,
        transcript_id: i64,
        module_name: &str,
        module_version: &str,
        input_hash: &str,
    ) -> StoreResult<Option<CachedResult>> {
        let Some(module_run) = self
            .store
            .find_cacheable_run(transcript_id, module_name, module_version, input_hash)
            .await?
        else {
            CacheMiss {
                module: module_name,
                input_hash,
            }
            .log();
            return Ok(None);
        };

        let artifacts = self.store.artifacts_for_module_run(module_run.id).await?;
        if let Some(missing) = artifacts.iter().find(|a| !a.absolute_path().is_file()) {
            CacheInvalidated {
                module: module_name,
                module_run_id: module_run.id,
                missing: &missing.artifact_key,
            }
            .log();
            return Ok(None);
        }

        CacheHit {
            module: module_name,
            module_run_id: module_run.id,
        }
        .log();
        Ok(Some(CachedResult {
            module_run,
            artifacts,
        }))
    }

    /// Open an in-progress module run.
    pub async fn start_run(&self, new_run: &NewModuleRun<'_>) -> StoreResult<ModuleRun> {
        if let Some(reason) = new_run.cache_reason {
            CacheBypassed {
                module: new_run.module_name,
                reason: reason.as_str(),
            }
            .log();
        }
        self.store.create_module_run(new_run).await
    }

    /// Complete a module run. A cacheable completion supersedes the previous
    /// authoritative run for the same key in the same transaction.
    pub async fn record_completion(
        &self,
        module_run: &ModuleRun,
        output_hash: &str,
        is_cacheable: bool,
        payload: &Value,
        duration: Duration,
    ) -> StoreResult<u64> {
        self.record_completion_with_artifacts(
            module_run,
            output_hash,
            is_cacheable,
            payload,
            duration,
            &[],
        )
        .await
        .map(|(superseded, _)| superseded)
    }

    /// [`record_completion`](Self::record_completion) that indexes the run's
    /// prepared artifacts in the same transaction. On error nothing is
    /// written and the run stays in progress.
    pub async fn record_completion_with_artifacts(
        &self,
        module_run: &ModuleRun,
        output_hash: &str,
        is_cacheable: bool,
        payload: &Value,
        duration: Duration,
        artifacts: &[NewArtifactRecord],
    ) -> StoreResult<(u64, Vec<ArtifactRecord>)> {
        let outputs_json = serde_json::to_string(payload)?;
        let (superseded, records) = self
            .store
            .complete_module_run_with_artifacts(
                module_run.id,
                output_hash,
                Some(&outputs_json),
                is_cacheable,
                duration_ms(duration),
                artifacts,
            )
            .await?;

        if !records.is_empty() {
            ArtifactsRegistered {
                module: &module_run.module_name,
                module_run_id: module_run.id,
                count: records.len(),
            }
            .log();
        }
        if superseded > 0 {
            RunsSuperseded {
                module: &module_run.module_name,
                module_run_id: module_run.id,
                superseded,
            }
            .log();
        }
        Ok((superseded, records))
    }

    pub async fn record_failure(&self, module_run: &ModuleRun, duration: Duration) -> StoreResult<()> {
        self.store
            .fail_module_run(module_run.id, duration_ms(duration))
            .await
    }

    /// Record in `pipeline_run_id` that `cached` was reused.
    pub async fn record_cache_hit(
        &self,
        pipeline_run_id: i64,
        cached: &CachedResult,
    ) -> StoreResult<ModuleRun> {
        self.store
            .record_cache_hit(pipeline_run_id, &cached.module_run)
            .await
    }
}

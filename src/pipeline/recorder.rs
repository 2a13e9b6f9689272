// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::artifacts::ArtifactRegistry;
use crate::cache::hashing::{output_hash, InputHasher};
use crate::cache::ModuleCache;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, StoreError};
use crate::registry::ModuleDescriptor;
use crate::store::{ArtifactRole, CacheReason, ModuleRun, NewModuleRun};
use crate::traits::{ExecutionHooks, ModuleDisposition, ModuleResult};

#[derive(Default)]
struct RecorderState {
    /// In-progress module runs keyed by module name
    open: HashMap<String, ModuleRun>,
    /// Output hash of every module completed or reused in this run
    output_hashes: HashMap<String, String>,
}

/// Persists one pipeline run's module bookkeeping around the executor.
///
/// Before a module runs, its input hash is derived from the transcript, its
/// configuration and its dependencies' output hashes, and the cache is
/// consulted. After it returns, its artifacts are indexed and its run is
/// completed or failed.
pub(crate) struct RunRecorder {
    cache: ModuleCache,
    artifacts: ArtifactRegistry,
    config: PipelineConfig,
    transcript_id: i64,
    transcript_hash: String,
    pipeline_run_id: i64,
    artifact_root: PathBuf,
    state: Mutex<RecorderState>,
}

impl RunRecorder {
    pub(crate) fn new(
        cache: ModuleCache,
        config: PipelineConfig,
        transcript_id: i64,
        transcript_hash: impl Into<String>,
        pipeline_run_id: i64,
        artifact_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            artifacts: ArtifactRegistry::new(cache.store().clone()),
            cache,
            config,
            transcript_id,
            transcript_hash: transcript_hash.into(),
            pipeline_run_id,
            artifact_root: artifact_root.into(),
            state: Mutex::new(RecorderState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn input_hash(&self, descriptor: &ModuleDescriptor) -> String {
        let state = self.state();
        descriptor
            .dependencies
            .iter()
            .fold(
                InputHasher::new(
                    self.transcript_hash.as_str(),
                    self.config.module_config_hash(&descriptor.name),
                ),
                |hasher, dependency| {
                    hasher.dependency(
                        dependency.as_str(),
                        state.output_hashes.get(dependency).cloned(),
                    )
                },
            )
            .finish()
    }

    async fn complete(
        &self,
        descriptor: &ModuleDescriptor,
        module_run: &ModuleRun,
        result: &ModuleResult,
        duration: Duration,
    ) -> Result<(), PipelineError> {
        let output = match result {
            ModuleResult::Success(output) => output,
            ModuleResult::Failure { .. } => {
                self.cache.record_failure(module_run, duration).await?;
                return Ok(());
            }
        };

        // Artifacts are indexed in the completion transaction, so a module
        // run is never visible with only part of its artifacts.
        let completed = async {
            let prepared = self
                .artifacts
                .prepare_outputs(module_run, &self.artifact_root, &output.artifacts)
                .await?;
            let primary = prepared
                .iter()
                .filter(|a| a.artifact_role == ArtifactRole::Primary)
                .map(|a| (a.artifact_key.as_str(), a.content_hash.as_str()));
            let hash = output_hash(primary, &descriptor.name, &descriptor.version, &output.payload);
            self.cache
                .record_completion_with_artifacts(
                    module_run,
                    &hash,
                    descriptor.is_cacheable(),
                    &output.payload,
                    duration,
                    &prepared,
                )
                .await?;
            Ok::<_, StoreError>(hash)
        }
        .await;

        match completed {
            Ok(hash) => {
                self.state()
                    .output_hashes
                    .insert(descriptor.name.clone(), hash);
                Ok(())
            }
            Err(e) => {
                if let Err(fail_error) = self.cache.record_failure(module_run, duration).await {
                    tracing::warn!(module = %descriptor.name, error = %fail_error, "Failed to mark module run failed");
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl ExecutionHooks for RunRecorder {
    async fn before_module(
        &self,
        descriptor: &ModuleDescriptor,
    ) -> Result<ModuleDisposition, PipelineError> {
        let input_hash = self.input_hash(descriptor);
        let cacheable = descriptor.is_cacheable();

        if cacheable && !self.config.force_rerun {
            if let Some(hit) = self
                .cache
                .should_run(
                    self.transcript_id,
                    &descriptor.name,
                    &descriptor.version,
                    &input_hash,
                )
                .await?
            {
                self.cache.record_cache_hit(self.pipeline_run_id, &hit).await?;
                if let Some(hash) = hit.output_hash() {
                    self.state()
                        .output_hashes
                        .insert(descriptor.name.clone(), hash.to_string());
                }
                return Ok(ModuleDisposition::Reuse {
                    payload: hit.payload(),
                });
            }
        }

        let cache_reason = if !cacheable {
            Some(CacheReason::NonDeterministic)
        } else if self.config.force_rerun {
            Some(CacheReason::ForcedRerun)
        } else {
            None
        };
        let config_hash = self.config.module_config_hash(&descriptor.name);
        let module_run = self
            .cache
            .start_run(&NewModuleRun {
                pipeline_run_id: self.pipeline_run_id,
                transcript_id: self.transcript_id,
                module_name: &descriptor.name,
                module_version: &descriptor.version,
                module_config_hash: &config_hash,
                module_input_hash: &input_hash,
                is_cacheable: cacheable,
                cache_reason,
            })
            .await?;

        self.state()
            .open
            .insert(descriptor.name.clone(), module_run);
        Ok(ModuleDisposition::Execute)
    }

    async fn after_module(
        &self,
        descriptor: &ModuleDescriptor,
        result: &ModuleResult,
        duration: Duration,
    ) -> Result<(), PipelineError> {
        let module_run = self.state().open.remove(&descriptor.name).ok_or_else(|| {
            StoreError::InvalidValue {
                field: "module_name",
                value: descriptor.name.clone(),
            }
        })?;
        self.complete(descriptor, &module_run, result, duration).await
    }
}

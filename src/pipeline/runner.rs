// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::hashing::pipeline_input_hash;
use crate::cache::ModuleCache;
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::engine::{ExecutorFactory, RunReport};
use crate::errors::{PipelineError, PlanError};
use crate::observability::messages::engine::PipelineRunFinished;
use crate::observability::messages::StructuredLog;
use crate::pipeline::recorder::RunRecorder;
use crate::registry::{ExecutionPlan, ModuleRegistry};
use crate::store::{RunStatus, RunStore};
use crate::transcript::{canonical_base_name, JsonTranscriptLoader, TranscriptLoader};
use crate::traits::ModuleExecutor;

/// Resolve a module request into a plan.
///
/// An empty request falls back to the configured default modules, and to
/// every registered module when none are configured.
pub fn resolve_request<S: AsRef<str>>(
    registry: &ModuleRegistry,
    config: &PipelineConfig,
    requested: &[S],
) -> Result<ExecutionPlan, PlanError> {
    if !requested.is_empty() {
        return registry.resolve(requested.iter().map(|s| s.as_ref()));
    }
    if !config.default_modules.is_empty() {
        return registry.resolve(&config.default_modules);
    }
    registry.resolve(registry.names())
}

/// Runs requested analysis modules against one transcript and records the
/// run, its module runs and their artifacts.
pub struct PipelineRunner {
    registry: Arc<ModuleRegistry>,
    store: RunStore,
    config: PipelineConfig,
    loader: Arc<dyn TranscriptLoader>,
    executor: Box<dyn ModuleExecutor>,
}

impl PipelineRunner {
    pub fn new(registry: Arc<ModuleRegistry>, store: RunStore, config: PipelineConfig) -> Self {
        Self {
            executor: ExecutorFactory::from_config(&config),
            registry,
            store,
            config,
            loader: Arc::new(JsonTranscriptLoader),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn TranscriptLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Resolve what a run would execute. See [`resolve_request`].
    pub fn plan<S: AsRef<str>>(&self, requested: &[S]) -> Result<ExecutionPlan, PlanError> {
        resolve_request(&self.registry, &self.config, requested)
    }

    /// Run `requested` modules, plus their dependencies, on the transcript at
    /// `transcript_path`.
    ///
    /// Planning and loading happen before anything is persisted. Module
    /// failures do not fail the call; they are listed in the report and the
    /// pipeline run is recorded as failed.
    pub async fn run_pipeline<S: AsRef<str>>(
        &self,
        transcript_path: impl AsRef<Path>,
        requested: &[S],
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let plan = self.plan(requested)?;

        let transcript_path = transcript_path.as_ref();
        let transcript = self.loader.load(transcript_path)?;
        let stored_path: PathBuf =
            std::fs::canonicalize(transcript_path).unwrap_or_else(|_| transcript_path.to_path_buf());
        let base_name = canonical_base_name(transcript_path);

        let record = self
            .store
            .upsert_transcript(
                &stored_path.to_string_lossy(),
                &transcript.content_hash,
                &base_name,
            )
            .await?;
        let config_hash = self.config.config_hash();
        let pipeline_run = self
            .store
            .create_pipeline_run(
                record.id,
                &self.config.pipeline_version,
                &config_hash,
                &pipeline_input_hash(&transcript.content_hash, &config_hash),
            )
            .await?;

        let output_dir = self.config.output_root.join(&base_name);
        if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
            self.store
                .finish_pipeline_run(pipeline_run.id, RunStatus::Failed)
                .await?;
            return Err(e.into());
        }

        let recorder = RunRecorder::new(
            ModuleCache::new(self.store.clone()),
            self.config.clone(),
            record.id,
            transcript.content_hash.clone(),
            pipeline_run.id,
            output_dir.clone(),
        );
        let context = Arc::new(PipelineContext::new(&stored_path, transcript, output_dir));

        let mut report = self
            .executor
            .execute_with_hooks(&plan, Arc::clone(&context), &recorder)
            .await;
        context.close();

        let status = if report.is_success() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.store
            .finish_pipeline_run(pipeline_run.id, status)
            .await?;
        report.pipeline_run_id = Some(pipeline_run.id);

        PipelineRunFinished {
            pipeline_run_id: pipeline_run.id,
            status: status.as_str(),
            duration: started.elapsed(),
        }
        .log();
        Ok(report)
    }
}

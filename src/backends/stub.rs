// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only analysis modules for exercising the executor and the pipeline.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backends::local::modules::write_json_artifact;
use crate::context::PipelineContext;
use crate::traits::{AnalysisModule, ArtifactOutput, ModuleResult};

/// Succeeds immediately with `{"module": name}`.
pub struct StubModule {
    name: &'static str,
}

impl StubModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl AnalysisModule for StubModule {
    async fn run(&self, _context: Arc<PipelineContext>) -> ModuleResult {
        ModuleResult::success(json!({ "module": self.name }))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// A module that always fails for testing failure scenarios
pub struct FailingModule {
    name: &'static str,
}

impl FailingModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl AnalysisModule for FailingModule {
    async fn run(&self, _context: Arc<PipelineContext>) -> ModuleResult {
        ModuleResult::failure("Simulated module failure")
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

pub struct PanickingModule {
    name: &'static str,
}

impl PanickingModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl AnalysisModule for PanickingModule {
    async fn run(&self, _context: Arc<PipelineContext>) -> ModuleResult {
        panic!("simulated panic in {}", self.name);
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Fails unless every listed module already has a result in the context.
pub struct RequiresResultsModule {
    name: &'static str,
    requires: Vec<&'static str>,
}

impl RequiresResultsModule {
    pub fn new(name: &'static str, requires: &[&'static str]) -> Self {
        Self {
            name,
            requires: requires.to_vec(),
        }
    }
}

#[async_trait]
impl AnalysisModule for RequiresResultsModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        for dependency in &self.requires {
            if context.get_analysis_result(dependency).is_none() {
                return ModuleResult::failure(format!("{} ran before {}", self.name, dependency));
            }
        }
        ModuleResult::success(json!({ "module": self.name }))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Records how many tracked modules run at the same time.
#[derive(Default)]
pub struct ConcurrencyTracker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<&'static str>>,
}

impl ConcurrencyTracker {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<&'static str> {
        self.started.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Sleeps for a fixed delay while registered with a [`ConcurrencyTracker`].
pub struct SlowModule {
    name: &'static str,
    delay: Duration,
    tracker: Arc<ConcurrencyTracker>,
}

impl SlowModule {
    pub fn new(name: &'static str, delay: Duration, tracker: Arc<ConcurrencyTracker>) -> Self {
        Self {
            name,
            delay,
            tracker,
        }
    }
}

#[async_trait]
impl AnalysisModule for SlowModule {
    async fn run(&self, _context: Arc<PipelineContext>) -> ModuleResult {
        if let Ok(mut started) = self.tracker.started.lock() {
            started.push(self.name);
        }
        let now = self.tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        ModuleResult::success(json!({ "module": self.name }))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Writes one primary JSON artifact and counts its invocations.
pub struct CountingModule {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

impl CountingModule {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl AnalysisModule for CountingModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let payload = json!({ "module": self.name, "segments": context.segments().len() });
        let relative = format!(
            "{}/data/global/{}_{}.json",
            self.name,
            context.base_name(),
            self.name
        );

        match write_json_artifact(&context, &relative, &payload).await {
            Ok(artifact) => {
                tracing::debug!(module = self.name, call, "Counting module wrote artifact");
                ModuleResult::with_artifacts(payload, vec![artifact])
            }
            Err(e) => ModuleResult::failure(e),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Reports the same artifact path twice.
pub struct DuplicateArtifactModule {
    name: &'static str,
}

impl DuplicateArtifactModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl AnalysisModule for DuplicateArtifactModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let relative = format!("{}/data/global/{}_dup.json", self.name, context.base_name());
        match write_json_artifact(&context, &relative, &json!({})).await {
            Ok(artifact) => ModuleResult::with_artifacts(json!({}), vec![artifact.clone(), artifact]),
            Err(e) => ModuleResult::failure(e),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Writes two artifacts but also reports a third it never wrote.
pub struct UnwrittenArtifactModule {
    name: &'static str,
}

impl UnwrittenArtifactModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl AnalysisModule for UnwrittenArtifactModule {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult {
        let mut artifacts = Vec::new();
        for part in ["first", "second"] {
            let relative = format!(
                "{}/data/global/{}_{}.json",
                self.name,
                context.base_name(),
                part
            );
            match write_json_artifact(&context, &relative, &json!({ "part": part })).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => return ModuleResult::failure(e),
            }
        }
        artifacts.push(ArtifactOutput::new(format!(
            "{}/data/global/{}_third.json",
            self.name,
            context.base_name()
        )));
        ModuleResult::with_artifacts(json!({}), artifacts)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

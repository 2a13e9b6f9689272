// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-aware parallel executor.
//!
//! A module is dispatched only after every one of its dependencies has
//! completed, whether by executing in this run or by being reused from the
//! cache. At most `max_workers` modules execute at once. A module that fails
//! or panics is recorded and the run keeps going; anything that transitively
//! depends on it never becomes ready and is reported as a dependency
//! deadlock once nothing else can make progress.
//!
//! # Scheduling
//!
//! The scheduling loop owns all bookkeeping (pending, running, completed), so
//! no locks are needed around it. Workers live in a `JoinSet`; a `Semaphore`
//! caps how many of them run a module at once. Each module body runs in its
//! own spawned task so a panic surfaces as a `JoinError` for that module
//! instead of tearing down the loop.
//!
//! Readiness is recomputed after each completion, and after hooks for that
//! completion have run, so a dependent never starts before the dependency's
//! bookkeeping is persisted.

use async_trait::async_trait;
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::consts::DEFAULT_MAX_WORKERS;
use crate::context::PipelineContext;
use crate::engine::RunReport;
use crate::errors::{ModuleError, ModuleErrorKind};
use crate::observability::messages::engine::{
    ExecutionCompleted, ExecutionStarted, ModuleCompleted, ModuleDeadlocked, ModuleFailed,
    ModuleReused, ModuleStarted,
};
use crate::observability::messages::StructuredLog;
use crate::registry::{ExecutionPlan, ModuleDescriptor};
use crate::traits::{ExecutionHooks, ModuleDisposition, ModuleExecutor, ModuleResult};

/// What a worker hands back to the scheduling loop.
struct Completion {
    module: String,
    result: ModuleResult,
    duration: Duration,
}

#[derive(Debug, Clone)]
pub struct ParallelExecutor {
    max_workers: usize,
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

impl ParallelExecutor {
    /// `max_workers` below one is raised to one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn spawn_module(
        workers: &mut JoinSet<Completion>,
        permits: &Arc<Semaphore>,
        descriptor: Arc<ModuleDescriptor>,
        context: Arc<PipelineContext>,
    ) {
        let permits = Arc::clone(permits);
        workers.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await.ok();
            ModuleStarted {
                module: &descriptor.name,
            }
            .log();

            let started = Instant::now();
            let module = Arc::clone(&descriptor.entry_point);
            let result = match tokio::spawn(async move { module.run(context).await }).await {
                Ok(result) => result,
                Err(join_error) if join_error.is_panic() => {
                    ModuleResult::failure(panic_message(join_error.into_panic()))
                }
                Err(join_error) => ModuleResult::failure(join_error.to_string()),
            };

            Completion {
                module: descriptor.name.clone(),
                result,
                duration: started.elapsed(),
            }
        });
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("module panicked: {}", detail)
}

fn log_error(error: &ModuleError) {
    match &error.kind {
        ModuleErrorKind::DependencyDeadlock { unmet } => ModuleDeadlocked {
            module: &error.module,
            unmet,
        }
        .log(),
        kind => ModuleFailed {
            module: &error.module,
            error: kind,
        }
        .log(),
    }
}

#[async_trait]
impl ModuleExecutor for ParallelExecutor {
    async fn execute_with_hooks(
        &self,
        plan: &ExecutionPlan,
        context: Arc<PipelineContext>,
        hooks: &dyn ExecutionHooks,
    ) -> RunReport {
        let started = Instant::now();
        ExecutionStarted {
            module_count: plan.len(),
            max_workers: self.max_workers,
        }
        .log();

        let mut report = RunReport::new(plan.order().to_vec());
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut workers: JoinSet<Completion> = JoinSet::new();

        // Pending modules keep plan order so dispatch is deterministic.
        let mut pending: Vec<String> = plan.order().to_vec();
        let mut running: BTreeSet<String> = BTreeSet::new();
        let mut completed: HashSet<String> = HashSet::new();

        loop {
            // === DISPATCH ===
            // Reused modules complete instantly and may unlock more modules,
            // so keep scanning until a pass dispatches nothing new.
            loop {
                let ready: Vec<String> = pending
                    .iter()
                    .filter(|module| plan.dependencies_of(module).all(|d| completed.contains(d)))
                    .cloned()
                    .collect();
                if ready.is_empty() {
                    break;
                }
                pending.retain(|module| !ready.contains(module));

                let mut reused_any = false;
                for module in ready {
                    let Some(descriptor) = plan.descriptor(&module).cloned() else {
                        continue;
                    };
                    match hooks.before_module(&descriptor).await {
                        Ok(ModuleDisposition::Execute) => {
                            running.insert(module);
                            Self::spawn_module(
                                &mut workers,
                                &permits,
                                descriptor,
                                Arc::clone(&context),
                            );
                        }
                        Ok(ModuleDisposition::Reuse { payload }) => {
                            if let Some(payload) = payload {
                                context.store_analysis_result(&module, payload);
                            }
                            ModuleReused { module: &module }.log();
                            completed.insert(module.clone());
                            report.modules_reused.push(module);
                            reused_any = true;
                        }
                        Err(e) => {
                            let error = ModuleError::new(
                                module,
                                ModuleErrorKind::Persistence {
                                    message: e.to_string(),
                                },
                            );
                            log_error(&error);
                            report.errors.push(error);
                        }
                    }
                }
                if !reused_any {
                    break;
                }
            }

            // === COLLECT ===
            let Some(joined) = workers.join_next().await else {
                break;
            };
            let completion = match joined {
                Ok(completion) => completion,
                Err(join_error) => {
                    // Workers catch module panics themselves; this only fires
                    // if the worker wrapper itself was lost.
                    tracing::error!(error = %join_error, "Worker task lost");
                    continue;
                }
            };

            running.remove(&completion.module);
            let Some(descriptor) = plan.descriptor(&completion.module) else {
                continue;
            };
            let recorded = hooks
                .after_module(descriptor, &completion.result, completion.duration)
                .await;

            match (completion.result, recorded) {
                (ModuleResult::Success(output), Ok(())) => {
                    context.store_analysis_result(&completion.module, output.payload);
                    ModuleCompleted {
                        module: &completion.module,
                        duration: completion.duration,
                    }
                    .log();
                    completed.insert(completion.module.clone());
                    report.modules_run.push(completion.module);
                }
                (ModuleResult::Success(_), Err(e)) => {
                    let error = ModuleError::new(
                        completion.module,
                        ModuleErrorKind::Persistence {
                            message: e.to_string(),
                        },
                    );
                    log_error(&error);
                    report.errors.push(error);
                }
                (ModuleResult::Failure { message }, recorded) => {
                    if let Err(e) = recorded {
                        tracing::warn!(module = %completion.module, error = %e, "Failed to record module failure");
                    }
                    let error = ModuleError::execution(completion.module, message);
                    log_error(&error);
                    report.errors.push(error);
                }
            }
        }

        // === SETTLE ===
        for module in running {
            let error = ModuleError::execution(module, "worker task was lost before completion");
            log_error(&error);
            report.errors.push(error);
        }
        for module in pending {
            let unmet: Vec<String> = plan
                .dependencies_of(&module)
                .filter(|d| !completed.contains(*d))
                .cloned()
                .collect();
            let error = ModuleError::new(module, ModuleErrorKind::DependencyDeadlock { unmet });
            log_error(&error);
            report.errors.push(error);
        }

        report.duration = started.elapsed();
        ExecutionCompleted {
            modules_run: report.modules_run.len(),
            modules_reused: report.modules_reused.len(),
            errors: report.errors.len(),
            duration: report.duration,
        }
        .log();
        report
    }
}

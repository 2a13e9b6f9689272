// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backends::local::modules::test_support::context_in;
use crate::backends::stub::{
    ConcurrencyTracker, FailingModule, PanickingModule, RequiresResultsModule, SlowModule, StubModule,
};
use crate::engine::ParallelExecutor;
use crate::errors::{ModuleErrorKind, PipelineError, StoreError};
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::traits::{ExecutionHooks, ModuleDisposition, ModuleExecutor, ModuleResult};

/// Integration tests for the parallel executor using stub modules
#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(descriptors: Vec<ModuleDescriptor>) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for descriptor in descriptors {
            registry.register(descriptor).unwrap();
        }
        registry
    }

    /// Reuses the listed modules and records every hook call.
    #[derive(Default)]
    struct ScriptedHooks {
        reuse: Vec<&'static str>,
        reject_after: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutionHooks for ScriptedHooks {
        async fn before_module(
            &self,
            descriptor: &ModuleDescriptor,
        ) -> Result<ModuleDisposition, PipelineError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("before:{}", descriptor.name));
            if self.reuse.iter().any(|m| *m == descriptor.name) {
                return Ok(ModuleDisposition::Reuse {
                    payload: Some(json!({ "module": descriptor.name, "cached": true })),
                });
            }
            Ok(ModuleDisposition::Execute)
        }

        async fn after_module(
            &self,
            descriptor: &ModuleDescriptor,
            _result: &ModuleResult,
            _duration: Duration,
        ) -> Result<(), PipelineError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("after:{}", descriptor.name));
            if self.reject_after.iter().any(|m| *m == descriptor.name) {
                return Err(StoreError::InvalidValue {
                    field: "outputs",
                    value: descriptor.name.clone(),
                }
                .into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dependencies_complete_before_dependents_start() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("a", Arc::new(RequiresResultsModule::new("a", &[]))),
            ModuleDescriptor::new("b", Arc::new(RequiresResultsModule::new("b", &["a"])))
                .with_dependencies(["a"]),
            ModuleDescriptor::new("c", Arc::new(RequiresResultsModule::new("c", &["a"])))
                .with_dependencies(["a"]),
            ModuleDescriptor::new("d", Arc::new(RequiresResultsModule::new("d", &["b", "c"])))
                .with_dependencies(["b", "c"]),
        ]);
        let plan = registry.resolve(["d"]).unwrap();

        let report = ParallelExecutor::new(4)
            .execute(&plan, context_in(dir.path()))
            .await;

        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.modules_run.len(), 4);
        assert_eq!(report.modules_run.first().map(String::as_str), Some("a"));
        assert_eq!(report.modules_run.last().map(String::as_str), Some("d"));
        assert_eq!(report.execution_order, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_max_workers() {
        let dir = tempfile::TempDir::new().unwrap();
        let tracker = Arc::new(ConcurrencyTracker::default());
        let delay = Duration::from_millis(40);
        let names = ["m1", "m2", "m3", "m4", "m5", "m6"];
        let registry = registry_of(
            names
                .iter()
                .map(|name| {
                    ModuleDescriptor::new(
                        *name,
                        Arc::new(SlowModule::new(*name, delay, Arc::clone(&tracker))),
                    )
                })
                .collect(),
        );
        let plan = registry.resolve(names).unwrap();

        let report = ParallelExecutor::new(2)
            .execute(&plan, context_in(dir.path()))
            .await;

        assert!(report.is_success());
        assert_eq!(report.modules_run.len(), 6);
        assert_eq!(tracker.started().len(), 6);
        assert!(tracker.peak() <= 2, "peak was {}", tracker.peak());
        assert!(tracker.peak() >= 1);
    }

    #[tokio::test]
    async fn test_independent_modules_overlap() {
        let dir = tempfile::TempDir::new().unwrap();
        let tracker = Arc::new(ConcurrencyTracker::default());
        let delay = Duration::from_millis(100);
        let registry = registry_of(vec![
            ModuleDescriptor::new("x", Arc::new(SlowModule::new("x", delay, Arc::clone(&tracker)))),
            ModuleDescriptor::new("y", Arc::new(SlowModule::new("y", delay, Arc::clone(&tracker)))),
        ]);
        let plan = registry.resolve(["x", "y"]).unwrap();

        let report = ParallelExecutor::new(4)
            .execute(&plan, context_in(dir.path()))
            .await;

        assert!(report.is_success());
        assert_eq!(tracker.peak(), 2);
    }

    #[tokio::test]
    async fn test_failure_deadlocks_dependents_but_not_siblings() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("a", Arc::new(FailingModule::new("a"))),
            ModuleDescriptor::new("b", Arc::new(StubModule::new("b"))).with_dependencies(["a"]),
            ModuleDescriptor::new("c", Arc::new(StubModule::new("c"))),
            ModuleDescriptor::new("d", Arc::new(StubModule::new("d"))).with_dependencies(["b"]),
        ]);
        let plan = registry.resolve(["c", "d"]).unwrap();
        let context = context_in(dir.path());

        let report = ParallelExecutor::new(2)
            .execute(&plan, Arc::clone(&context))
            .await;

        assert!(!report.is_success());
        assert_eq!(report.modules_run, vec!["c"]);
        assert!(matches!(
            report.error_for("a").map(|e| &e.kind),
            Some(ModuleErrorKind::Execution { .. })
        ));
        assert_eq!(
            report.error_for("b").map(|e| e.kind.clone()),
            Some(ModuleErrorKind::DependencyDeadlock {
                unmet: vec!["a".to_string()]
            })
        );
        assert_eq!(
            report.error_for("d").map(|e| e.kind.clone()),
            Some(ModuleErrorKind::DependencyDeadlock {
                unmet: vec!["b".to_string()]
            })
        );
        assert_eq!(report.deadlocked().count(), 2);
        assert!(context.get_analysis_result("c").is_some());
        assert!(context.get_analysis_result("a").is_none());
    }

    #[tokio::test]
    async fn test_panicking_module_is_reported_as_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("boom", Arc::new(PanickingModule::new("boom"))),
            ModuleDescriptor::new("steady", Arc::new(StubModule::new("steady"))),
        ]);
        let plan = registry.resolve(["boom", "steady"]).unwrap();

        let report = ParallelExecutor::new(2)
            .execute(&plan, context_in(dir.path()))
            .await;

        assert_eq!(report.modules_run, vec!["steady"]);
        match report.error_for("boom").map(|e| &e.kind) {
            Some(ModuleErrorKind::Execution { message }) => {
                assert!(message.starts_with("module panicked"), "{}", message);
                assert!(message.contains("simulated panic in boom"));
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reused_modules_count_as_completed() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("a", Arc::new(FailingModule::new("a"))),
            ModuleDescriptor::new("b", Arc::new(RequiresResultsModule::new("b", &["a"])))
                .with_dependencies(["a"]),
        ]);
        let plan = registry.resolve(["b"]).unwrap();
        let context = context_in(dir.path());
        let hooks = ScriptedHooks {
            reuse: vec!["a"],
            ..Default::default()
        };

        let report = ParallelExecutor::new(1)
            .execute_with_hooks(&plan, Arc::clone(&context), &hooks)
            .await;

        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.modules_reused, vec!["a"]);
        assert_eq!(report.modules_run, vec!["b"]);
        assert_eq!(
            context.get_analysis_result("a"),
            Some(json!({"module": "a", "cached": true}))
        );

        let calls = hooks.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["before:a", "before:b", "after:b"]);
    }

    #[tokio::test]
    async fn test_after_hook_error_blocks_dependents() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("a", Arc::new(StubModule::new("a"))),
            ModuleDescriptor::new("b", Arc::new(StubModule::new("b"))).with_dependencies(["a"]),
        ]);
        let plan = registry.resolve(["b"]).unwrap();
        let context = context_in(dir.path());
        let hooks = ScriptedHooks {
            reject_after: vec!["a"],
            ..Default::default()
        };

        let report = ParallelExecutor::new(2)
            .execute_with_hooks(&plan, Arc::clone(&context), &hooks)
            .await;

        assert!(report.modules_run.is_empty());
        assert!(matches!(
            report.error_for("a").map(|e| &e.kind),
            Some(ModuleErrorKind::Persistence { .. })
        ));
        assert!(report.error_for("b").map(|e| e.is_deadlock()).unwrap_or(false));
        assert!(context.get_analysis_result("a").is_none());
    }

    #[tokio::test]
    async fn test_every_module_is_accounted_for_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = registry_of(vec![
            ModuleDescriptor::new("a", Arc::new(StubModule::new("a"))),
            ModuleDescriptor::new("b", Arc::new(FailingModule::new("b"))).with_dependencies(["a"]),
            ModuleDescriptor::new("c", Arc::new(StubModule::new("c"))).with_dependencies(["b"]),
            ModuleDescriptor::new("d", Arc::new(StubModule::new("d"))).with_dependencies(["a"]),
        ]);
        let plan = registry.resolve(["c", "d"]).unwrap();
        let hooks = ScriptedHooks {
            reuse: vec!["d"],
            ..Default::default()
        };

        let report = ParallelExecutor::default()
            .execute_with_hooks(&plan, context_in(dir.path()), &hooks)
            .await;

        let mut seen: Vec<String> = report
            .modules_run
            .iter()
            .chain(report.modules_reused.iter())
            .cloned()
            .chain(report.errors.iter().map(|e| e.module.clone()))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_zero_workers_is_clamped() {
        let executor = ParallelExecutor::new(0);
        assert_eq!(executor.max_workers(), 1);
    }
}

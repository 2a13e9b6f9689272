// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::context::PipelineContext;
use crate::engine::RunReport;
use crate::errors::PipelineError;
use crate::registry::{ExecutionPlan, ModuleDescriptor};
use crate::traits::analysis_module::ModuleResult;

/// What to do with a module that has become ready.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleDisposition {
    /// Run the module
    Execute,
    /// Skip it and treat it as completed; the payload, when present, is
    /// published to the context as the module's result
    Reuse { payload: Option<Value> },
}

/// Callbacks around each module in a run.
///
/// The executor calls `before_module` when a module becomes ready and
/// `after_module` once it returns, before any dependent is considered. A hook
/// error marks the module as not completed.
#[async_trait]
pub trait ExecutionHooks: Send + Sync {
    async fn before_module(
        &self,
        _descriptor: &ModuleDescriptor,
    ) -> Result<ModuleDisposition, PipelineError> {
        Ok(ModuleDisposition::Execute)
    }

    async fn after_module(
        &self,
        _descriptor: &ModuleDescriptor,
        _result: &ModuleResult,
        _duration: Duration,
    ) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Hooks that run every module and record nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExecutionHooks for NoopHooks {}

#[async_trait]
pub trait ModuleExecutor: Send + Sync {
    /// Execute every module of `plan`, respecting dependencies.
    ///
    /// Module failures never abort the run; they are collected in the
    /// returned report.
    async fn execute(&self, plan: &ExecutionPlan, context: Arc<PipelineContext>) -> RunReport {
        self.execute_with_hooks(plan, context, &NoopHooks).await
    }

    async fn execute_with_hooks(
        &self,
        plan: &ExecutionPlan,
        context: Arc<PipelineContext>,
        hooks: &dyn ExecutionHooks,
    ) -> RunReport;
}

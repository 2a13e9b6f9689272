// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::context::PipelineContext;
use crate::store::ArtifactRole;

#[async_trait]
pub trait AnalysisModule: Send + Sync {
    async fn run(&self, context: Arc<PipelineContext>) -> ModuleResult;

    fn name(&self) -> &'static str;
}

/// A file a module wrote under the context's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutput {
    /// Path relative to `PipelineContext::output_dir`
    pub relative_path: PathBuf,
    /// Explicit role; inferred from the path when `None`
    pub role: Option<ArtifactRole>,
}

impl ArtifactOutput {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: ArtifactRole) -> Self {
        self.role = Some(role);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutput {
    pub payload: Value,
    pub artifacts: Vec<ArtifactOutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleResult {
    Success(ModuleOutput),
    Failure { message: String },
}

impl ModuleResult {
    pub fn success(payload: Value) -> Self {
        ModuleResult::Success(ModuleOutput {
            payload,
            artifacts: Vec::new(),
        })
    }

    pub fn with_artifacts(payload: Value, artifacts: Vec<ArtifactOutput>) -> Self {
        ModuleResult::Success(ModuleOutput { payload, artifacts })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ModuleResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ModuleResult::Success(_))
    }
}

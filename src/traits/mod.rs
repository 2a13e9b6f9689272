// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod analysis_module;
pub mod executor;

pub use analysis_module::{AnalysisModule, ArtifactOutput, ModuleOutput, ModuleResult};
pub use executor::{ExecutionHooks, ModuleDisposition, ModuleExecutor, NoopHooks};

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::PipelineConfig;
use crate::engine::parallel::ParallelExecutor;
use crate::traits::ModuleExecutor;

/// Factory for creating module executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create a module executor sized by the configured worker count
    pub fn from_config(cfg: &PipelineConfig) -> Box<dyn ModuleExecutor> {
        Box::new(ParallelExecutor::new(cfg.executor.max_workers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::modules::test_support::context_in;
    use crate::backends::local::LocalModuleFactory;

    #[tokio::test]
    async fn test_factory_executor_runs_builtin_plan() {
        let mut cfg = PipelineConfig::default();
        cfg.executor.max_workers = 1;
        let executor = ExecutorFactory::from_config(&cfg);

        let dir = tempfile::TempDir::new().unwrap();
        let registry = LocalModuleFactory::builtin_registry().unwrap();
        let plan = registry.resolve(["summary"]).unwrap();

        let report = executor.execute(&plan, context_in(dir.path())).await;
        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.modules_run.len(), 3);
    }
}

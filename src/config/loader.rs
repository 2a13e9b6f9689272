// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::cache::hashing::hash_payload;
use crate::config::consts::{DEFAULT_DATABASE_URL, DEFAULT_MAX_WORKERS, DEFAULT_OUTPUT_ROOT};
use crate::errors::ConfigError;
use crate::registry::ModuleRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for the transcript pipeline.
///
/// Typically loaded from a YAML file. Every field has a default, so an empty
/// document is a valid configuration.
///
/// # Fields
/// * `pipeline_version` - Recorded on every pipeline run
/// * `database_url` - SQLite URL of the run store
/// * `output_root` - Directory that per-transcript artifact directories live under
/// * `executor` - Executor options
/// * `force_rerun` - Skip cache lookups and recompute every module
/// * `default_modules` - Modules to run when none are requested explicitly
/// * `modules` - Per-module options; a module's options feed its cache key
///
/// # Example
/// ```yaml
/// pipeline_version: "2024.1"
/// database_url: sqlite://runs.db
/// output_root: outputs
/// executor:
///   max_workers: 4
/// default_modules: [stats, summary]
/// modules:
///   word_frequency:
///     top_n: 20
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_pipeline_version")]
    pub pipeline_version: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default)]
    pub executor: ExecutorOptions,
    #[serde(default)]
    pub force_rerun: bool,
    #[serde(default)]
    pub default_modules: Vec<String>,
    #[serde(default)]
    pub modules: BTreeMap<String, Value>,
}

/// Executor-specific configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutorOptions {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

fn default_pipeline_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_version: default_pipeline_version(),
            database_url: default_database_url(),
            output_root: default_output_root(),
            executor: ExecutorOptions::default(),
            force_rerun: false,
            default_modules: Vec::new(),
            modules: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Options for one module; an empty object when none are configured.
    pub fn module_options(&self, module: &str) -> Value {
        self.modules
            .get(module)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    pub fn module_config_hash(&self, module: &str) -> String {
        hash_payload(&self.module_options(module))
    }

    /// Hash of everything in the configuration that affects analysis output.
    pub fn config_hash(&self) -> String {
        hash_payload(&serde_json::json!({
            "pipeline_version": self.pipeline_version,
            "modules": self.modules,
        }))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "executor.max_workers must be at least 1".to_string(),
            ));
        }
        if self.pipeline_version.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "pipeline_version must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that every configured or default module is registered.
    pub fn validate_against(&self, registry: &ModuleRegistry) -> Result<(), ConfigError> {
        let unknown: Vec<&str> = self
            .modules
            .keys()
            .chain(self.default_modules.iter())
            .filter(|name| !registry.contains(name))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "unknown modules in configuration: {}",
                unknown.join(", ")
            )))
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: PipelineConfig = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::LocalModuleFactory;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
pipeline_version: "2024.1"
database_url: sqlite://runs.db
executor:
  max_workers: 2
default_modules: [stats]
modules:
  word_frequency:
    top_n: 10
"#;

        let cfg: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.pipeline_version, "2024.1");
        assert_eq!(cfg.executor.max_workers, 2);
        assert_eq!(cfg.default_modules, vec!["stats"]);
        assert_eq!(cfg.module_options("word_frequency")["top_n"], 10);
        assert_eq!(cfg.output_root, PathBuf::from(DEFAULT_OUTPUT_ROOT));
        assert!(!cfg.force_rerun);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg: PipelineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let cfg: PipelineConfig = serde_yaml::from_str("executor:\n  max_workers: 0\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_module_options_feed_config_hashes() {
        let mut cfg = PipelineConfig::default();
        let untouched = cfg.module_config_hash("stats");
        let before = cfg.config_hash();

        cfg.modules
            .insert("word_frequency".to_string(), serde_json::json!({"top_n": 5}));

        assert_ne!(cfg.config_hash(), before);
        assert_eq!(cfg.module_config_hash("stats"), untouched);
        assert_ne!(cfg.module_config_hash("word_frequency"), untouched);
    }

    #[test]
    fn test_validate_against_registry() {
        let registry = LocalModuleFactory::builtin_registry().unwrap();
        let mut cfg = PipelineConfig::default();
        cfg.default_modules = vec!["stats".to_string()];
        assert!(cfg.validate_against(&registry).is_ok());

        cfg.modules.insert("nonexistent".to_string(), Value::Null);
        assert!(cfg.validate_against(&registry).is_err());
    }

    #[test]
    fn test_load_and_validate_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "executor:\n  max_workers: 3\n").unwrap();

        let cfg = load_and_validate_config(&path).unwrap();
        assert_eq!(cfg.executor.max_workers, 3);
        assert!(matches!(
            load_config(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}

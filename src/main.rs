// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use transcript_pipeline::artifacts::ArtifactValidator;
use transcript_pipeline::backends::local::LocalModuleFactory;
use transcript_pipeline::config::{load_and_validate_config, PipelineConfig};
use transcript_pipeline::observability::init_tracing;
use transcript_pipeline::pipeline::{resolve_request, PipelineRunner};
use transcript_pipeline::store::RunStore;

#[derive(Parser)]
#[command(name = "transcript-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental, cache-aware transcript analysis", long_about = None)]
struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true, env = "TRANSCRIPT_PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured run store URL
    #[arg(long, global = true, env = "TRANSCRIPT_PIPELINE_DATABASE_URL")]
    database_url: Option<String>,

    /// Override the configured output root
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run analysis modules on a transcript
    Run {
        /// Transcript file (JSON)
        transcript: PathBuf,

        /// Modules to run; dependencies are added automatically
        modules: Vec<String>,

        /// Maximum modules executing at once
        #[arg(short = 'j', long)]
        max_workers: Option<usize>,

        /// Recompute every module instead of reusing cached results
        #[arg(long)]
        force: bool,
    },

    /// Check a transcript's artifacts against the run store
    Validate {
        /// Transcript id, content hash or path
        transcript: String,

        /// Only check artifacts of this pipeline run
        #[arg(long)]
        pipeline_run: Option<i64>,

        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },

    /// Show what a run would execute, in order
    Plan {
        modules: Vec<String>,
    },

    /// List available modules
    Modules,
}

fn load_settings(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");
    let cli = Cli::parse();
    let mut config = load_settings(&cli)?;
    let registry = Arc::new(LocalModuleFactory::builtin_registry()?);
    config.validate_against(&registry)?;

    match cli.command {
        Commands::Run {
            transcript,
            modules,
            max_workers,
            force,
        } => {
            if let Some(max_workers) = max_workers {
                config.executor.max_workers = max_workers;
            }
            config.force_rerun |= force;
            config.validate()?;

            let store = RunStore::connect(&config.database_url).await?;
            let runner = PipelineRunner::new(Arc::clone(&registry), store, config);
            let report = runner.run_pipeline(&transcript, &modules).await?;

            println!("📋 Transcript: {}", transcript.display());
            if let Some(id) = report.pipeline_run_id {
                println!("🔢 Pipeline run: {}", id);
            }
            println!("🔄 Order: {}", report.execution_order.join(" → "));
            println!("✅ Ran: {}", report.modules_run.join(", "));
            println!("♻️  Reused: {}", report.modules_reused.join(", "));
            for error in &report.errors {
                println!("❌ {}", error);
            }
            println!("⏱️  Duration: {:?}", report.duration);

            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Validate {
            transcript,
            pipeline_run,
            strict,
        } => {
            let store = RunStore::connect(&config.database_url).await?;
            let validator = ArtifactValidator::new(store, &config.output_root);
            let report = validator.validate(&transcript, pipeline_run, strict).await?;

            println!(
                "📊 Checked {} records and {} files",
                report.checked_records, report.checked_files
            );
            for finding in &report.p0_errors {
                println!("P0  {}", finding);
            }
            for finding in &report.p1_errors {
                println!("P1  {}", finding);
            }
            for finding in &report.warnings {
                println!("WARN {}", finding);
            }
            std::process::exit(report.exit_code());
        }
        Commands::Plan { modules } => {
            let plan = resolve_request(&registry, &config, &modules)?;

            println!("🔄 Execution order:");
            for (i, level) in plan.levels().iter().enumerate() {
                println!("  level {}: {}", i, level.join(", "));
            }
            for (module, required_by) in plan.added_as_dependencies() {
                println!("  + {} (required by {})", module, required_by);
            }
        }
        Commands::Modules => {
            for descriptor in registry.descriptors() {
                let dependencies: Vec<&str> =
                    descriptor.dependencies.iter().map(String::as_str).collect();
                println!(
                    "{:<18} v{:<4} {:?}/{:?}  {}",
                    descriptor.name,
                    descriptor.version,
                    descriptor.category,
                    descriptor.determinism_tier,
                    descriptor.description
                );
                if !dependencies.is_empty() {
                    println!("{:<18} depends on: {}", "", dependencies.join(", "));
                }
            }
        }
    }

    Ok(())
}

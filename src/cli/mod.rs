// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod accuracy;
pub mod categories;
pub mod count;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CounterConfig;
use crate::detection::{Detector, StaticDetector};
use crate::learning::BaseWeightsTrainer;
use crate::monitoring::PrometheusMetricsSink;
use crate::safety::ImageHeuristicScorer;
use crate::service::{Collaborators, ObjectCounterService};
use crate::storage::FileKeyValueStore;
use crate::version;

/// Fabstir object counter CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-counter")]
#[command(version)]
#[command(about = "Count objects, manage learned categories and track accuracy", long_about = None)]
pub struct Cli {
    /// Data directory (overrides COUNTER_DATA_DIR)
    #[arg(long, global = true, env = "COUNTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count objects of a type in an image
    Count(count::CountArgs),

    /// Run only the safety gate on an image or a precomputed score
    SafetyCheck(count::SafetyCheckArgs),

    /// Learn a new category from sample images
    Learn(categories::LearnArgs),

    /// Inspect or delete learned categories
    #[command(subcommand)]
    Categories(categories::CategoriesCommand),

    /// Record a user-corrected count
    Correct(accuracy::CorrectArgs),

    /// Show running accuracy for an object type
    Accuracy(accuracy::AccuracyArgs),

    /// Print build and feature information
    Version,
}

/// Service plus the metrics sink it reports to
pub struct CliContext {
    pub service: ObjectCounterService,
    pub metrics: Arc<PrometheusMetricsSink>,
}

impl CliContext {
    pub async fn build(config: CounterConfig, detections: Option<&Path>) -> Result<Self> {
        let detector: Arc<dyn Detector> = match detections {
            Some(path) => Arc::new(
                StaticDetector::from_json_file(path)
                    .await
                    .with_context(|| format!("loading detections from {}", path.display()))?,
            ),
            None => Arc::new(StaticDetector::default()),
        };
        let metrics = Arc::new(PrometheusMetricsSink::new());

        let collaborators = Collaborators {
            detector,
            scorer: Arc::new(ImageHeuristicScorer::default()),
            trainer: Arc::new(BaseWeightsTrainer::new(
                &config.learning.base_weights,
                &config.learning.models_dir,
            )),
            store: Arc::new(FileKeyValueStore::new(config.store_dir())),
            metrics: metrics.clone(),
        };

        let service = ObjectCounterService::new(config, collaborators).await?;
        Ok(Self { service, metrics })
    }
}

/// Read an image file, returning its bytes and file name
pub async fn read_image(path: &Path) -> Result<(Vec<u8>, Option<String>)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading image {}", path.display()))?;
    if bytes.is_empty() {
        return Err(anyhow!("image file {} is empty", path.display()));
    }
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    Ok((bytes, filename))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        return print_json(&version::get_version_info());
    }

    let config = match &cli.data_dir {
        Some(data_dir) => CounterConfig::from_lookup(|key| match key {
            "COUNTER_DATA_DIR" => Some(data_dir.display().to_string()),
            _ => std::env::var(key).ok(),
        }),
        None => CounterConfig::from_env(),
    };
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;

    let detections = match &cli.command {
        Commands::Count(args) => args.detections.clone(),
        _ => None,
    };
    let context = CliContext::build(config, detections.as_deref()).await?;

    match cli.command {
        Commands::Count(args) => count::count(&context, args).await?,
        Commands::SafetyCheck(args) => count::safety_check(&context, args).await?,
        Commands::Learn(args) => categories::learn(&context, args).await?,
        Commands::Categories(command) => categories::run(&context, command).await?,
        Commands::Correct(args) => accuracy::correct(&context, args).await?,
        Commands::Accuracy(args) => accuracy::show(&context, args).await?,
        // Printed before the service is built
        Commands::Version => {}
    }

    if cli.print_metrics {
        print!("{}", context.metrics.export()?);
    }
    Ok(())
}

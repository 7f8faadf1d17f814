// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{print_json, read_image, CliContext};
use crate::learning::LearnOptions;

/// Arguments for the learn command
#[derive(Args, Debug)]
pub struct LearnArgs {
    /// Name of the new category
    #[arg(long)]
    pub name: String,

    /// Training images (at least LEARNING_MIN_SAMPLES)
    #[arg(long = "sample", required = true, num_args = 1..)]
    pub samples: Vec<PathBuf>,

    /// Confidence threshold stored with the category
    #[arg(long)]
    pub confidence_threshold: Option<f32>,
}

#[derive(Subcommand, Debug)]
pub enum CategoriesCommand {
    /// List learned category names
    List,

    /// Show a learned category
    Show {
        /// Category name
        name: String,
    },

    /// Delete a learned category and its training data
    Delete {
        /// Category name
        name: String,
    },
}

pub async fn learn(context: &CliContext, args: LearnArgs) -> Result<()> {
    let mut samples = Vec::with_capacity(args.samples.len());
    for path in &args.samples {
        let (bytes, _) = read_image(path).await?;
        samples.push(bytes);
    }

    // Ctrl-C aborts training without touching the registry
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling training");
            guard.cancel();
        }
    });

    let options = LearnOptions {
        confidence_threshold: args.confidence_threshold,
        cancel: Some(cancel),
    };
    let result = context
        .service
        .learn_category(&args.name, samples, options)
        .await;
    interrupt.abort();

    let category = result?;
    info!(
        "🎓 Learned '{}' from {} samples",
        category.name, category.sample_count
    );
    print_json(&category)
}

pub async fn run(context: &CliContext, command: CategoriesCommand) -> Result<()> {
    match command {
        CategoriesCommand::List => {
            let names = context.service.list_categories().await;
            print_json(&names)
        }
        CategoriesCommand::Show { name } => {
            let category = context
                .service
                .get_category(&name)
                .await
                .ok_or_else(|| anyhow!("Object type '{}' not learned yet", name))?;
            print_json(&category)
        }
        CategoriesCommand::Delete { name } => {
            let report = context.service.delete_category(&name).await;
            if !report.removed {
                return Err(anyhow!("Object type '{}' not learned yet", name));
            }
            for failure in &report.cleanup_failures {
                warn!("Cleanup failure: {}", failure);
            }
            print_json(&report)
        }
    }
}

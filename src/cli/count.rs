// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use super::{print_json, read_image, CliContext};
use crate::service::CountRequest;

/// Arguments for the count command
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Image to count objects in
    #[arg(long)]
    pub image: PathBuf,

    /// Object type to count (built-in type, or a learned category with --learned)
    #[arg(long)]
    pub object_type: String,

    /// JSON file with raw detector output for the image
    #[arg(long)]
    pub detections: Option<PathBuf>,

    /// Count with the artifact of a learned category
    #[arg(long)]
    pub learned: bool,
}

/// Arguments for the safety-check command
#[derive(Args, Debug)]
pub struct SafetyCheckArgs {
    /// Requested object type
    #[arg(long)]
    pub object_type: String,

    /// Image to score
    #[arg(long, conflicts_with = "score", required_unless_present = "score")]
    pub image: Option<PathBuf>,

    /// Precomputed heuristic score in [0, 1]
    #[arg(long)]
    pub score: Option<f32>,

    /// File name hint when passing a score
    #[arg(long)]
    pub filename: Option<String>,

    /// Show process safety statistics afterwards
    #[arg(long)]
    pub stats: bool,
}

pub async fn count(context: &CliContext, args: CountArgs) -> Result<()> {
    let (image, filename) = read_image(&args.image).await?;

    if args.learned {
        let outcome = context
            .service
            .count_learned(&image, &args.object_type, filename.as_deref())
            .await?;
        return print_json(&outcome);
    }

    let mut request = CountRequest::new(image, args.object_type.as_str());
    if let Some(filename) = filename {
        request = request.with_filename(filename);
    }
    let outcome = context.service.count_objects(&request).await?;

    match &outcome.result {
        Some(result) => info!(
            "🔢 {} x '{}' (confidence {:.2})",
            result.count, result.target_type, result.confidence
        ),
        None => info!(
            "🚫 Request blocked: {}",
            outcome.verdict.reason.as_deref().unwrap_or_default()
        ),
    }
    print_json(&outcome)
}

pub async fn safety_check(context: &CliContext, args: SafetyCheckArgs) -> Result<()> {
    let verdict = match (&args.image, args.score) {
        (Some(path), _) => {
            let (image, filename) = read_image(path).await?;
            let hint = args.filename.clone().or(filename);
            context
                .service
                .screen_image(&image, &args.object_type, hint.as_deref())
                .await
        }
        (None, Some(score)) => {
            context
                .service
                .check_safety(score, &args.object_type, args.filename.as_deref())
        }
        (None, None) => return Err(anyhow!("either --image or --score is required")),
    };

    print_json(&verdict)?;
    if args.stats {
        print_json(&context.service.safety_statistics())?;
    }
    Ok(())
}

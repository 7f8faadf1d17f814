// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;

use super::{print_json, CliContext};
use crate::qa::AccuracyReport;

/// Arguments for the correct command
#[derive(Args, Debug)]
pub struct CorrectArgs {
    /// Object type that was counted
    #[arg(long)]
    pub object_type: String,

    /// Count the service produced
    #[arg(long)]
    pub predicted: u32,

    /// True count supplied by the user
    #[arg(long)]
    pub corrected: u32,
}

/// Arguments for the accuracy command
#[derive(Args, Debug)]
pub struct AccuracyArgs {
    /// Object type to report on; all corrected types when omitted
    #[arg(long)]
    pub object_type: Option<String>,
}

pub async fn correct(context: &CliContext, args: CorrectArgs) -> Result<()> {
    let report = context
        .service
        .record_correction(&args.object_type, args.predicted, args.corrected)
        .await?;
    print_json(&report)
}

pub async fn show(context: &CliContext, args: AccuracyArgs) -> Result<()> {
    let object_types = match args.object_type {
        Some(object_type) => vec![object_type],
        None => context.service.estimator().object_types().await,
    };

    let mut reports: Vec<(String, AccuracyReport)> = Vec::with_capacity(object_types.len());
    for object_type in object_types {
        let report = context.service.get_accuracy(&object_type).await;
        reports.push((object_type, report));
    }
    print_json(&reports)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod accuracy;

pub use accuracy::{
    AccuracyConfig, AccuracyEstimator, AccuracyReport, AccuracyStat, CorrectionRecord,
    CORRECTIONS_KEY,
};

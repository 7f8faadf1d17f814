// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod metrics;

pub use metrics::{
    Labels, MetricsSink, NoopMetricsSink, PrometheusMetricsSink, LEARNED_CATEGORIES_TOTAL,
    MODEL_ACCURACY, MODEL_CONFIDENCE_SCORE, MODEL_PRECISION, MODEL_RECALL,
    OBJECTS_DETECTED_COUNT, SAFETY_BLOCKS_TOTAL, SAFETY_CHECKS_TOTAL,
    SAFETY_DETECTION_CONFIDENCE,
};

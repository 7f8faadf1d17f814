// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod detection;
pub mod errors;
pub mod learning;
pub mod monitoring;
pub mod qa;
pub mod safety;
pub mod service;
pub mod storage;
pub mod version;

// Re-export main types
pub use config::CounterConfig;
pub use detection::{
    AggregationConfig, CountAggregator, CountResult, Detection, Detector, RawDetection,
};
pub use errors::{CounterError, CounterResult};
pub use learning::{
    DeletionReport, LearnOptions, LearnedCategory, LearnedCategoryRegistry, LearningConfig,
    Trainer,
};
pub use monitoring::{MetricsSink, NoopMetricsSink, PrometheusMetricsSink};
pub use qa::{AccuracyConfig, AccuracyEstimator, AccuracyReport, AccuracyStat, CorrectionRecord};
pub use safety::{HeuristicScorer, SafetyConfig, SafetyEngine, SafetyVerdict};
pub use service::{Collaborators, CountOutcome, CountRequest, LearnedCountOutcome, ObjectCounterService};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration loaded from environment variables

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::detection::AggregationConfig;
use crate::learning::LearningConfig;
use crate::qa::AccuracyConfig;
use crate::safety::SafetyConfig;

/// Top-level configuration for the object counter
#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// Root for the key-value store, trained models and base weights
    pub data_dir: PathBuf,
    pub aggregation: AggregationConfig,
    pub safety: SafetyConfig,
    pub learning: LearningConfig,
    pub accuracy: AccuracyConfig,
}

impl CounterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| -> Option<f32> { parse_var(&lookup, key) };
        let data_dir = lookup("COUNTER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let default_aggregation = AggregationConfig::default();
        let aggregation = AggregationConfig {
            direct_match_threshold: parsed("COUNT_DIRECT_MATCH_THRESHOLD")
                .unwrap_or(default_aggregation.direct_match_threshold),
            cross_category_threshold: parsed("COUNT_CROSS_CATEGORY_THRESHOLD")
                .unwrap_or(default_aggregation.cross_category_threshold),
            cross_category_discount: parsed("COUNT_CROSS_CATEGORY_DISCOUNT")
                .unwrap_or(default_aggregation.cross_category_discount),
            ..default_aggregation
        };

        let default_safety = SafetyConfig::default();
        let safety = SafetyConfig {
            heuristic_block_threshold: parsed("SAFETY_HEURISTIC_BLOCK_THRESHOLD")
                .unwrap_or(default_safety.heuristic_block_threshold),
            blocked_type_terms: lookup("SAFETY_BLOCKED_TERMS")
                .map(|v| split_list(&v))
                .unwrap_or(default_safety.blocked_type_terms.clone()),
            ..default_safety
        };

        let default_learning = LearningConfig::default();
        let learning = LearningConfig {
            min_training_samples: parse_var(&lookup, "LEARNING_MIN_SAMPLES")
                .unwrap_or(default_learning.min_training_samples),
            default_confidence_threshold: parsed("LEARNING_DEFAULT_CONFIDENCE_THRESHOLD")
                .unwrap_or(default_learning.default_confidence_threshold),
            training_timeout: parse_var(&lookup, "LEARNING_TRAINING_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default_learning.training_timeout),
            models_dir: data_dir.join("few_shot").join("models"),
            base_weights: lookup("LEARNING_BASE_WEIGHTS")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("weights").join("yolov8n.pt")),
        };

        let accuracy = AccuracyConfig {
            min_samples: parse_var(&lookup, "ACCURACY_MIN_SAMPLES")
                .unwrap_or(AccuracyConfig::default().min_samples),
        };

        Self {
            data_dir,
            aggregation,
            safety,
            learning,
            accuracy,
        }
    }

    /// Directory backing the file key-value store
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.aggregation.validate()?;
        self.safety.validate()?;
        self.learning.validate()?;
        self.accuracy.validate()?;
        Ok(())
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            aggregation: AggregationConfig::default(),
            safety: SafetyConfig::default(),
            learning: LearningConfig::default(),
            accuracy: AccuracyConfig::default(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

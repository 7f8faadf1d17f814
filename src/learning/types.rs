// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{CounterError, CounterResult};

const MAX_CATEGORY_NAME_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Learned,
}

/// Registry entry for a dynamically learned object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedCategory {
    pub name: String,
    /// Reference to the trained model artifact returned by the trainer
    pub artifact_ref: String,
    pub sample_count: usize,
    pub confidence_threshold: f32,
    /// Hex SHA-256 over the training samples
    pub sample_digest: String,
    /// Store prefix holding this generation's training samples
    pub training_data_prefix: String,
    pub created_at: DateTime<Utc>,
    pub status: CategoryStatus,
}

/// Outcome of a best-effort delete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub name: String,
    /// Whether the category was present and is now gone from the registry
    pub removed: bool,
    /// Secondary cleanup steps that failed (artifact, training data, persistence)
    pub cleanup_failures: Vec<String>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.cleanup_failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LearningConfig {
    pub min_training_samples: usize,
    pub default_confidence_threshold: f32,
    /// Upper bound on a single training run
    pub training_timeout: Duration,
    /// Directory for trained artifacts
    pub models_dir: PathBuf,
    /// Base detector weights the placeholder trainer starts from
    pub base_weights: PathBuf,
}

/// Fewest samples any learned category may be trained from
pub const MIN_TRAINING_SAMPLES_FLOOR: usize = 3;

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_training_samples: 3,
            default_confidence_threshold: 0.5,
            training_timeout: Duration::from_secs(300),
            models_dir: PathBuf::from("./data/few_shot/models"),
            base_weights: PathBuf::from("./data/weights/yolov8n.pt"),
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_training_samples < MIN_TRAINING_SAMPLES_FLOOR {
            return Err(format!(
                "min_training_samples must be at least {}, got {}",
                MIN_TRAINING_SAMPLES_FLOOR, self.min_training_samples
            ));
        }
        if !(0.0..=1.0).contains(&self.default_confidence_threshold) {
            return Err(format!(
                "default_confidence_threshold must be within [0, 1], got {}",
                self.default_confidence_threshold
            ));
        }
        if self.training_timeout.is_zero() {
            return Err("training_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Category names double as store keys, so they must be plain path segments
pub fn validate_category_name(name: &str) -> CounterResult<()> {
    if name.trim().is_empty() {
        return Err(CounterError::Validation(
            "Object type name is required".to_string(),
        ));
    }
    if name.trim() != name {
        return Err(CounterError::Validation(format!(
            "Object type name '{}' has leading or trailing whitespace",
            name
        )));
    }
    if name.len() > MAX_CATEGORY_NAME_LEN {
        return Err(CounterError::Validation(format!(
            "Object type name exceeds {} characters",
            MAX_CATEGORY_NAME_LEN
        )));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(CounterError::Validation(format!(
            "Object type name '{}' contains path characters",
            name
        )));
    }
    Ok(())
}

/// Hex SHA-256 over length-prefixed samples
pub fn digest_samples(samples: &[Vec<u8>]) -> String {
    let mut hasher = Sha256::new();
    for sample in samples {
        hasher.update((sample.len() as u64).to_le_bytes());
        hasher.update(sample);
    }
    hex::encode(hasher.finalize())
}

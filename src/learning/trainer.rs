// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Trainer collaborator: turns training samples into a model artifact

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("Base weights not found: {0}")]
    BaseWeightsMissing(String),

    #[error("Training failed: {0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Model training capability. Implementations may be slow; callers never hold
/// registry locks while training.
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Train a model for `name` and return a reference to the artifact
    async fn train(&self, name: &str, samples: &[Vec<u8>]) -> Result<String, TrainerError>;

    /// Remove a previously produced artifact
    async fn discard(&self, artifact_ref: &str) -> Result<(), TrainerError>;
}

/// Placeholder trainer: the "trained" artifact is a copy of the base detector
/// weights stored as `<models_dir>/<name>_<nanos>_model.pt`, one file per run
#[derive(Debug, Clone)]
pub struct BaseWeightsTrainer {
    base_weights: PathBuf,
    models_dir: PathBuf,
}

impl BaseWeightsTrainer {
    pub fn new(base_weights: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_weights: base_weights.into(),
            models_dir: models_dir.into(),
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        let now = Utc::now();
        let generation = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_millis());
        self.models_dir.join(format!("{}_{}_model.pt", name, generation))
    }
}

#[async_trait]
impl Trainer for BaseWeightsTrainer {
    async fn train(&self, name: &str, samples: &[Vec<u8>]) -> Result<String, TrainerError> {
        if !fs::try_exists(&self.base_weights).await? {
            return Err(TrainerError::BaseWeightsMissing(
                self.base_weights.display().to_string(),
            ));
        }
        if samples.is_empty() {
            return Err(TrainerError::Failed("no training samples".to_string()));
        }

        fs::create_dir_all(&self.models_dir).await?;
        let artifact = self.artifact_path(name);
        fs::copy(&self.base_weights, &artifact).await?;

        info!(
            "🏋️ Trained '{}' from {} samples -> {}",
            name,
            samples.len(),
            artifact.display()
        );
        Ok(artifact.display().to_string())
    }

    async fn discard(&self, artifact_ref: &str) -> Result<(), TrainerError> {
        match fs::remove_file(artifact_ref).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

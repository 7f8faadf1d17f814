// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector collaborator boundary
//!
//! The neural network is opaque to the counter: anything that turns image bytes
//! into raw `(class_id, confidence, bbox)` triples can be plugged in here.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::detection::types::RawDetection;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid detector output: {0}")]
    InvalidOutput(String),
}

/// Object detector capability
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run detection on encoded image bytes.
    ///
    /// `artifact_ref` selects a learned model artifact; `None` uses the base model.
    async fn detect(
        &self,
        image: &[u8],
        artifact_ref: Option<&str>,
    ) -> Result<Vec<RawDetection>, DetectorError>;

    /// Model name reported in metrics
    fn model_name(&self) -> &str {
        "detector"
    }
}

/// Detector that replays a fixed detection list, e.g. output captured from an
/// external inference run
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<RawDetection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }

    /// Load a JSON array of raw detections
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let path = path.as_ref();
        let contents = tokio::fs::read(path).await.map_err(|e| {
            DetectorError::ModelNotLoaded(format!("{}: {}", path.display(), e))
        })?;
        let detections: Vec<RawDetection> = serde_json::from_slice(&contents)
            .map_err(|e| DetectorError::InvalidOutput(e.to_string()))?;
        Ok(Self::new(detections))
    }
}

#[async_trait]
impl Detector for StaticDetector {
    async fn detect(
        &self,
        _image: &[u8],
        _artifact_ref: Option<&str>,
    ) -> Result<Vec<RawDetection>, DetectorError> {
        Ok(self.detections.clone())
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

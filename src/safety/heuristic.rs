// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Heuristic visual scorer boundary and the default image-characteristics scorer

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scorer task failed: {0}")]
    Internal(String),
}

/// Produces a score in [0, 1] for how likely an image holds policy-sensitive content
#[async_trait]
pub trait HeuristicScorer: Send + Sync {
    async fn score(&self, image: &[u8], filename_hint: Option<&str>) -> Result<f32, ScoringError>;
}

/// Geometry and brightness of a decoded image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageCharacteristics {
    pub width: u32,
    pub height: u32,
    /// Mean luma in [0, 1]
    pub brightness: f32,
    pub aspect_ratio: f32,
}

impl ImageCharacteristics {
    /// Brightness assumed when it cannot be measured
    pub const FALLBACK_BRIGHTNESS: f32 = 0.3;

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn from_image(image: &image::DynamicImage) -> Self {
        let width = image.width();
        let height = image.height();
        let luma = image.to_luma8();
        let pixels = luma.as_raw();

        let brightness = if pixels.is_empty() {
            Self::FALLBACK_BRIGHTNESS
        } else {
            let total: u64 = pixels.iter().map(|&p| p as u64).sum();
            (total as f64 / pixels.len() as f64 / 255.0) as f32
        };

        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f32 / height as f32
        };

        Self {
            width,
            height,
            brightness,
            aspect_ratio,
        }
    }
}

// Pixel-count and brightness cut-offs of the scoring rules
const SENSITIVE_FILENAME_MIN_PIXELS: u64 = 100_000;
const SENSITIVE_FILENAME_MAX_BRIGHTNESS: f32 = 0.4;
const UNUSUAL_ASPECT_LOW: f32 = 0.5;
const UNUSUAL_ASPECT_HIGH: f32 = 2.5;
const DARK_IMAGE_MIN_PIXELS: u64 = 500_000;
const DARK_IMAGE_MAX_BRIGHTNESS: f32 = 0.2;
const DARK_IMAGE_ASPECT_RANGE: (f32, f32) = (0.3, 3.0);
const VERY_LARGE_PIXELS: u64 = 1_000_000;
const TANK_LIKE_MIN_PIXELS: u64 = 800_000;
const TANK_LIKE_MAX_BRIGHTNESS: f32 = 0.15;

/// Scores images from their dimensions, brightness and filename.
///
/// Stands in for a trained classifier: a sensitive filename combined with
/// large, dark or oddly shaped images scores high, as do very large dark
/// images on their own.
#[derive(Debug, Clone)]
pub struct ImageHeuristicScorer {
    filename_keywords: Vec<String>,
}

impl Default for ImageHeuristicScorer {
    fn default() -> Self {
        Self {
            filename_keywords: [
                "tank", "military", "armor", "combat", "battle", "war", "defense", "soldier",
                "vehicle",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ImageHeuristicScorer {
    pub fn new(filename_keywords: Vec<String>) -> Self {
        Self { filename_keywords }
    }

    pub fn has_sensitive_filename(&self, filename_hint: Option<&str>) -> bool {
        let Some(filename) = filename_hint else {
            return false;
        };
        let lower = filename.to_lowercase();
        self.filename_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Apply the scoring rules to measured characteristics
    pub fn score_characteristics(
        &self,
        chars: &ImageCharacteristics,
        filename_hint: Option<&str>,
    ) -> f32 {
        let sensitive_name = self.has_sensitive_filename(filename_hint);
        let pixels = chars.pixel_count();
        let mut score: f32 = 0.0;

        if sensitive_name
            && (pixels > SENSITIVE_FILENAME_MIN_PIXELS
                || chars.brightness < SENSITIVE_FILENAME_MAX_BRIGHTNESS
                || chars.aspect_ratio < UNUSUAL_ASPECT_LOW
                || chars.aspect_ratio > UNUSUAL_ASPECT_HIGH)
        {
            score = 0.85;
        }

        if !sensitive_name
            && pixels > DARK_IMAGE_MIN_PIXELS
            && (DARK_IMAGE_ASPECT_RANGE.0..=DARK_IMAGE_ASPECT_RANGE.1).contains(&chars.aspect_ratio)
            && chars.brightness < DARK_IMAGE_MAX_BRIGHTNESS
        {
            score = 0.8;
        }

        if sensitive_name && pixels > VERY_LARGE_PIXELS {
            score = score.max(0.9);
        }

        if sensitive_name
            && pixels > TANK_LIKE_MIN_PIXELS
            && chars.brightness < TANK_LIKE_MAX_BRIGHTNESS
        {
            score = score.max(0.85);
        }

        debug!(
            "Heuristic score {:.2} ({}x{}, brightness {:.2}, aspect {:.2}, sensitive filename: {})",
            score, chars.width, chars.height, chars.brightness, chars.aspect_ratio, sensitive_name
        );

        score
    }

    /// Decode an image and measure its characteristics
    pub fn measure(bytes: &[u8]) -> Result<ImageCharacteristics, ScoringError> {
        if bytes.is_empty() {
            return Err(ScoringError::EmptyData);
        }
        let decoded =
            image::load_from_memory(bytes).map_err(|e| ScoringError::DecodeFailed(e.to_string()))?;
        Ok(ImageCharacteristics::from_image(&decoded))
    }
}

#[async_trait]
impl HeuristicScorer for ImageHeuristicScorer {
    async fn score(&self, image: &[u8], filename_hint: Option<&str>) -> Result<f32, ScoringError> {
        // Decoding is CPU-bound; keep it off the async workers
        let bytes = image.to_vec();
        let chars = tokio::task::spawn_blocking(move || Self::measure(&bytes))
            .await
            .map_err(|e| ScoringError::Internal(e.to_string()))??;

        Ok(self.score_characteristics(&chars, filename_hint))
    }
}

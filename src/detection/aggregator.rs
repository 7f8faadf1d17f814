// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Count aggregation over mapped detections

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detection::category_mapper::{CocoCategoryMapper, LabelMapper, ANIMAL_TYPES};
use crate::detection::detector::Detector;
use crate::detection::types::{CountResult, Detection, RawDetection};

/// Matching thresholds for the count aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Minimum confidence for a detection whose label equals the target
    pub direct_match_threshold: f32,
    /// Minimum confidence for an animal counted toward a different animal target
    pub cross_category_threshold: f32,
    /// Factor applied to cross-category confidences before averaging
    pub cross_category_discount: f32,
    /// Labels that tolerate cross-category matches
    pub animal_types: Vec<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            direct_match_threshold: 0.15,
            cross_category_threshold: 0.3,
            cross_category_discount: 0.8,
            animal_types: ANIMAL_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("direct_match_threshold", self.direct_match_threshold),
            ("cross_category_threshold", self.cross_category_threshold),
            ("cross_category_discount", self.cross_category_discount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }

    fn is_animal(&self, label: &str) -> bool {
        self.animal_types.iter().any(|a| a.eq_ignore_ascii_case(label))
    }
}

/// Turns raw detections for one image into a count for a requested object type.
///
/// Stateless: safe to share across concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct CountAggregator {
    config: AggregationConfig,
}

impl CountAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregate using the static COCO mapping
    pub fn aggregate(&self, detections: &[RawDetection], target_type: &str) -> CountResult {
        self.aggregate_with(&CocoCategoryMapper, detections, target_type)
    }

    /// Aggregate using a caller-supplied label mapper
    pub fn aggregate_with(
        &self,
        mapper: &dyn LabelMapper,
        detections: &[RawDetection],
        target_type: &str,
    ) -> CountResult {
        let target = target_type.to_lowercase();
        let target_is_animal = self.config.is_animal(&target);

        let mut contributions: Vec<f32> = Vec::new();
        let mut annotated = Vec::with_capacity(detections.len());

        for raw in detections {
            let label = mapper.map(raw.class_id).to_lowercase();
            let contribution = self.contribution(&label, &target, target_is_animal, raw.confidence);

            if let Some(weighted) = contribution {
                contributions.push(weighted);
            }

            annotated.push(Detection {
                class_id: raw.class_id,
                class_label: label,
                confidence: raw.confidence,
                bbox: raw.bbox,
                counted: contribution.is_some(),
            });
        }

        let confidence = if contributions.is_empty() {
            0.0
        } else {
            let mean = contributions.iter().sum::<f32>() / contributions.len() as f32;
            mean.clamp(0.0, 1.0)
        };

        debug!(
            "Aggregated {} detections for '{}': count={}, confidence={:.3}",
            annotated.len(),
            target_type,
            contributions.len(),
            confidence
        );

        CountResult {
            count: contributions.len() as u32,
            confidence,
            detections: annotated,
            target_type: target_type.to_string(),
        }
    }

    /// Run the detector and aggregate. A failed detector call counts as zero detections.
    pub async fn detect_and_aggregate(
        &self,
        detector: &dyn Detector,
        mapper: &dyn LabelMapper,
        image: &[u8],
        artifact_ref: Option<&str>,
        target_type: &str,
    ) -> CountResult {
        match detector.detect(image, artifact_ref).await {
            Ok(detections) => self.aggregate_with(mapper, &detections, target_type),
            Err(e) => {
                warn!(
                    "⚠️ Detector '{}' failed for '{}', treating as zero detections: {}",
                    detector.model_name(),
                    target_type,
                    e
                );
                CountResult::empty(target_type)
            }
        }
    }

    /// Confidence this detection contributes to the target, `None` if it does not count
    fn contribution(
        &self,
        label: &str,
        target: &str,
        target_is_animal: bool,
        confidence: f32,
    ) -> Option<f32> {
        if label == target {
            return (confidence >= self.config.direct_match_threshold).then_some(confidence);
        }

        if target_is_animal
            && self.config.is_animal(label)
            && confidence >= self.config.cross_category_threshold
        {
            return Some(confidence * self.config.cross_category_discount);
        }

        None
    }
}

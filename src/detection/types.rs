// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection and count result types

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates (x1, y1, x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// Detector output before category mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Detector-native class identifier
    pub class_id: u32,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_id: u32, confidence: f32, bbox: impl Into<BoundingBox>) -> Self {
        Self {
            class_id,
            confidence,
            bbox: bbox.into(),
        }
    }
}

/// A detection tagged with its mapped label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub class_label: String,
    /// Raw detector confidence, never discounted
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// Whether this detection contributed to the count
    pub counted: bool,
}

/// Result of aggregating one image's detections for a target type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountResult {
    pub count: u32,
    /// Mean of counted confidences (cross-category matches discounted), 0.0 if none
    pub confidence: f32,
    /// Every detection in detector order, counted or not
    pub detections: Vec<Detection>,
    pub target_type: String,
}

impl CountResult {
    pub fn empty(target_type: impl Into<String>) -> Self {
        Self {
            count: 0,
            confidence: 0.0,
            detections: Vec::new(),
            target_type: target_type.into(),
        }
    }

    pub fn total_detections(&self) -> usize {
        self.detections.len()
    }

    /// Labels of every detection, in detector order
    pub fn detected_labels(&self) -> Vec<&str> {
        self.detections
            .iter()
            .map(|d| d.class_label.as_str())
            .collect()
    }

    pub fn counted_detections(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(|d| d.counted)
    }
}

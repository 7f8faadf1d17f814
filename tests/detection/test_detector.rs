// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for the replaying detector

use fabstir_object_counter::detection::{Detector, DetectorError, StaticDetector};
use tempfile::TempDir;

#[tokio::test]
async fn test_loads_detections_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("detections.json");
    std::fs::write(
        &path,
        r#"[
            {"class_id": 2, "confidence": 0.9, "bbox": {"x1": 0.0, "y1": 0.0, "x2": 10.0, "y2": 5.0}},
            {"class_id": 15, "confidence": 0.4, "bbox": {"x1": 1.0, "y1": 1.0, "x2": 2.0, "y2": 2.0}}
        ]"#,
    )
    .unwrap();

    let detector = StaticDetector::from_json_file(&path).await.unwrap();
    let detections = detector.detect(b"ignored", None).await.unwrap();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_id, 2);
    assert_eq!(detections[0].bbox.area(), 50.0);
    assert_eq!(detector.model_name(), "static");
}

#[tokio::test]
async fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = StaticDetector::from_json_file(temp_dir.path().join("nope.json")).await;
    assert!(matches!(result, Err(DetectorError::ModelNotLoaded(_))));
}

#[tokio::test]
async fn test_malformed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();
    let result = StaticDetector::from_json_file(&path).await;
    assert!(matches!(result, Err(DetectorError::InvalidOutput(_))));
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for metrics emitted by the service

use crate::common::{det, samples, MockDetector, MockScorer, TestRig};
use fabstir_object_counter::learning::LearnOptions;
use fabstir_object_counter::monitoring::{
    LEARNED_CATEGORIES_TOTAL, MODEL_ACCURACY, MODEL_CONFIDENCE_SCORE, OBJECTS_DETECTED_COUNT,
    SAFETY_BLOCKS_TOTAL, SAFETY_CHECKS_TOTAL,
};
use fabstir_object_counter::{CounterConfig, CountRequest, ObjectCounterService};

async fn service(rig: &TestRig) -> ObjectCounterService {
    ObjectCounterService::new(CounterConfig::default(), rig.collaborators())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_safety_metrics() {
    let rig = TestRig::new(MockDetector::default(), MockScorer::scoring(0.0));
    let service = service(&rig).await;

    service.check_safety(0.1, "cat", None);
    service.check_safety(0.1, "tank", None);

    assert_eq!(rig.metrics.named(SAFETY_CHECKS_TOTAL).len(), 2);
    let blocks = rig.metrics.named(SAFETY_BLOCKS_TOTAL);
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0]
        .labels
        .contains(&("reason".to_string(), "type_blocklist".to_string())));
    assert!(blocks[0]
        .labels
        .contains(&("object_type".to_string(), "tank".to_string())));
}

#[tokio::test]
async fn test_count_metrics() {
    let rig = TestRig::new(
        MockDetector::returning(vec![det(0, 0.9), det(0, 0.5)]),
        MockScorer::scoring(0.0),
    );
    let service = service(&rig).await;
    service
        .count_objects(&CountRequest::new(b"jpeg".to_vec(), "person"))
        .await
        .unwrap();

    let counts = rig.metrics.named(OBJECTS_DETECTED_COUNT);
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].value, 2.0);

    let confidence = rig.metrics.named(MODEL_CONFIDENCE_SCORE);
    assert_eq!(confidence.len(), 1);
    assert!(confidence[0]
        .labels
        .contains(&("model_name".to_string(), "mock".to_string())));
}

#[tokio::test]
async fn test_learning_and_accuracy_gauges() {
    let rig = TestRig::new(MockDetector::default(), MockScorer::scoring(0.0));
    let service = service(&rig).await;

    service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();
    service.delete_category("widget").await;

    let gauges: Vec<f64> = rig
        .metrics
        .named(LEARNED_CATEGORIES_TOTAL)
        .iter()
        .map(|m| m.value)
        .collect();
    // Startup, learn, delete
    assert_eq!(gauges, vec![0.0, 1.0, 0.0]);

    service.record_correction("car", 1, 1).await.unwrap();
    assert!(rig.metrics.named(MODEL_ACCURACY).is_empty());
    service.record_correction("car", 1, 1).await.unwrap();
    let accuracy = rig.metrics.named(MODEL_ACCURACY);
    assert_eq!(accuracy.len(), 1);
    assert_eq!(accuracy[0].value, 100.0);
}

#[tokio::test]
async fn test_learned_count_metrics_use_detector_name() {
    let rig = TestRig::new(MockDetector::returning(vec![det(0, 0.7)]), MockScorer::scoring(0.0));
    let service = service(&rig).await;
    let category = service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();

    service.count_learned(b"jpeg", "widget", None).await.unwrap();

    let confidence = rig.metrics.named(MODEL_CONFIDENCE_SCORE);
    assert_eq!(confidence.len(), 1);
    let labels = &confidence[0].labels;
    assert!(labels.contains(&("model_name".to_string(), "mock".to_string())));
    assert!(labels.contains(&("object_type".to_string(), "widget".to_string())));
    assert!(labels.iter().all(|(_, value)| value != &category.artifact_ref));
}

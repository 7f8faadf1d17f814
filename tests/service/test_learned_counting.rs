// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for learning categories and counting with them through the service

use crate::common::{det, samples, MockDetector, MockScorer, TestRig};
use fabstir_object_counter::learning::LearnOptions;
use fabstir_object_counter::{CounterConfig, CounterError, ObjectCounterService};

async fn service(rig: &TestRig) -> ObjectCounterService {
    ObjectCounterService::new(CounterConfig::default(), rig.collaborators())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_count_unlearned_category_fails() {
    let rig = TestRig::new(MockDetector::default(), MockScorer::scoring(0.0));
    let service = service(&rig).await;

    let err = service.count_learned(b"jpeg", "widget", None).await.unwrap_err();
    assert!(matches!(err, CounterError::CategoryNotLearned(ref name) if name == "widget"));
    assert_eq!(err.to_string(), "Object type 'widget' not learned yet");
}

#[tokio::test]
async fn test_learn_then_count() {
    let rig = TestRig::new(
        MockDetector::returning(vec![det(0, 0.7), det(0, 0.9), det(2, 0.9)]),
        MockScorer::scoring(0.0),
    );
    let service = service(&rig).await;

    let category = service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();

    let learned = service.count_learned(b"jpeg", "widget", None).await.unwrap();
    assert_eq!(learned.training_samples, 3);
    assert_eq!(learned.learned_at, category.created_at);

    let result = learned.outcome.result.unwrap();
    assert_eq!(result.count, 2);
    assert!((result.confidence - 0.8).abs() < 1e-6);
    assert_eq!(result.detected_labels(), vec!["widget", "widget", "car"]);

    // Detector was pointed at the learned artifact
    assert_eq!(
        rig.detector.artifact_refs.lock().unwrap()[0].as_deref(),
        Some(category.artifact_ref.as_str())
    );
}

#[tokio::test]
async fn test_learned_count_is_safety_gated() {
    let rig = TestRig::new(MockDetector::returning(vec![det(0, 0.9)]), MockScorer::scoring(0.95));
    let service = service(&rig).await;
    service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();

    let learned = service.count_learned(b"jpeg", "widget", None).await.unwrap();
    assert!(learned.outcome.is_blocked());
    assert!(learned.outcome.result.is_none());
    assert_eq!(rig.detector.calls(), 0);
}

#[tokio::test]
async fn test_category_lifecycle() {
    let rig = TestRig::new(MockDetector::default(), MockScorer::scoring(0.0));
    let service = service(&rig).await;

    service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();
    service
        .learn_category("widget", samples(3), LearnOptions::default())
        .await
        .unwrap();
    assert_eq!(service.list_categories().await.len(), 1);
    assert!(service.get_category("widget").await.is_some());

    let report = service.delete_category("widget").await;
    assert!(report.removed);
    assert!(service.get_category("widget").await.is_none());
    assert!(!service.delete_category("widget").await.removed);

    let err = service
        .learn_category("widget", samples(2), LearnOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(service.list_categories().await.is_empty());
}

#[tokio::test]
async fn test_state_survives_service_restart() {
    let rig = TestRig::new(MockDetector::default(), MockScorer::scoring(0.0));
    {
        let service = service(&rig).await;
        service
            .learn_category("widget", samples(3), LearnOptions::default())
            .await
            .unwrap();
        service.record_correction("car", 2, 2).await.unwrap();
        service.record_correction("car", 2, 3).await.unwrap();
    }

    let service = service(&rig).await;
    assert!(service.get_category("widget").await.is_some());
    assert_eq!(
        service.get_accuracy("car").await.stat().unwrap().accuracy_pct,
        50.0
    );
}

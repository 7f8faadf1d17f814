// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for learning and looking up categories

use crate::common::{samples, FlakyStore, MockTrainer};
use fabstir_object_counter::learning::{
    CategoryStatus, LearnOptions, LearnedCategoryRegistry, LearningConfig, REGISTRY_KEY,
};
use fabstir_object_counter::storage::KeyValueStore;
use fabstir_object_counter::CounterError;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn registry(store: Arc<FlakyStore>, trainer: Arc<MockTrainer>) -> LearnedCategoryRegistry {
    LearnedCategoryRegistry::load(LearningConfig::default(), store, trainer)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_learn_registers_category() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = registry(store.clone(), trainer.clone()).await;

    let category = registry.learn("widget", samples(3)).await.unwrap();
    assert_eq!(category.name, "widget");
    assert_eq!(category.artifact_ref, "artifact://widget/1");
    assert_eq!(category.sample_count, 3);
    assert_eq!(category.confidence_threshold, 0.5);
    assert_eq!(category.status, CategoryStatus::Learned);
    assert_eq!(category.sample_digest.len(), 64);

    assert_eq!(registry.get("widget").await, Some(category.clone()));
    assert!(registry.contains("widget").await);
    assert_eq!(registry.len().await, 1);

    // Registry document and samples are in the store
    assert!(store.get(REGISTRY_KEY).await.unwrap().is_some());
    let keys = store
        .list_keys(&category.training_data_prefix)
        .await
        .unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys[0].ends_with("training_000.jpg"));
    assert!(keys[0].starts_with("training/widget/"));
}

#[tokio::test]
async fn test_list_is_sorted_set() {
    let registry = registry(Arc::new(FlakyStore::new()), Arc::new(MockTrainer::new())).await;
    for name in ["zebra crossing", "antenna", "mailbox"] {
        registry.learn(name, samples(3)).await.unwrap();
    }
    let names: Vec<String> = registry.list().await.into_iter().collect();
    assert_eq!(names, vec!["antenna", "mailbox", "zebra crossing"]);
}

#[tokio::test]
async fn test_relearn_overwrites_single_entry() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = registry(store.clone(), trainer.clone()).await;

    let first = registry.learn("widget", samples(3)).await.unwrap();
    let second = registry.learn("widget", samples(4)).await.unwrap();

    assert_eq!(registry.len().await, 1);
    let current = registry.get("widget").await.unwrap();
    assert_eq!(current, second);
    assert_eq!(current.sample_count, 4);
    assert_eq!(current.artifact_ref, "artifact://widget/2");

    // Superseded generation is cleaned up
    assert_eq!(trainer.discarded(), vec![first.artifact_ref.clone()]);
    assert!(store
        .list_keys(&first.training_data_prefix)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .list_keys(&second.training_data_prefix)
            .await
            .unwrap()
            .len(),
        4
    );
}

#[tokio::test]
async fn test_too_few_samples_rejected() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = registry(store.clone(), trainer.clone()).await;

    let err = registry.learn("widget", samples(2)).await.unwrap_err();
    assert!(matches!(err, CounterError::Validation(_)));
    assert!(registry.is_empty().await);
    assert_eq!(trainer.trained.load(Ordering::SeqCst), 0);
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let registry = registry(Arc::new(FlakyStore::new()), Arc::new(MockTrainer::new())).await;
    for name in ["", "  ", "../escape", "a/b", "a\\b", " padded "] {
        let err = registry.learn(name, samples(3)).await.unwrap_err();
        assert!(err.is_validation(), "name {:?} should be rejected", name);
    }
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_confidence_threshold_option() {
    let registry = registry(Arc::new(FlakyStore::new()), Arc::new(MockTrainer::new())).await;

    let options = LearnOptions {
        confidence_threshold: Some(0.75),
        ..Default::default()
    };
    let category = registry
        .learn_with_options("widget", samples(3), options)
        .await
        .unwrap();
    assert_eq!(category.confidence_threshold, 0.75);

    let options = LearnOptions {
        confidence_threshold: Some(1.5),
        ..Default::default()
    };
    let err = registry
        .learn_with_options("gadget", samples(3), options)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(!registry.contains("gadget").await);
}

#[tokio::test]
async fn test_concurrent_learns() {
    let registry = Arc::new(registry(Arc::new(FlakyStore::new()), Arc::new(MockTrainer::new())).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let name = if i % 2 == 0 {
                "shared".to_string()
            } else {
                format!("item-{}", i)
            };
            registry.learn(&name, samples(3 + i)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let expected: BTreeSet<String> = ["shared", "item-1", "item-3", "item-5", "item-7"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(registry.list().await, expected);
}

#[tokio::test]
async fn test_registry_rejects_minimum_below_three_samples() {
    let config = LearningConfig {
        min_training_samples: 1,
        ..Default::default()
    };
    let result = LearnedCategoryRegistry::load(
        config,
        Arc::new(FlakyStore::new()),
        Arc::new(MockTrainer::new()),
    )
    .await;
    assert!(matches!(result, Err(CounterError::Validation(_))));
}

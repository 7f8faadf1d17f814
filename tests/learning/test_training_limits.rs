// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for training failures, timeouts and cancellation

use crate::common::{samples, FlakyStore, MockTrainer};
use fabstir_object_counter::learning::{LearnOptions, LearnedCategoryRegistry, LearningConfig};
use fabstir_object_counter::CounterError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_training_failure_leaves_registry_unchanged() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store.clone(), trainer.clone())
        .await
        .unwrap();

    trainer.fail.store(true, Ordering::SeqCst);
    let err = registry.learn("widget", samples(3)).await.unwrap_err();
    assert!(matches!(err, CounterError::TrainingFailed { ref name, .. } if name == "widget"));
    assert!(registry.is_empty().await);
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn test_training_timeout() {
    let config = LearningConfig {
        training_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let trainer = Arc::new(MockTrainer::slow(Duration::from_secs(5)));
    let registry = LearnedCategoryRegistry::load(config, Arc::new(FlakyStore::new()), trainer)
        .await
        .unwrap();

    let err = registry.learn("widget", samples(3)).await.unwrap_err();
    assert!(matches!(err, CounterError::TrainingTimedOut { .. }));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_training_cancellation() {
    let trainer = Arc::new(MockTrainer::slow(Duration::from_secs(5)));
    let registry = LearnedCategoryRegistry::load(
        LearningConfig::default(),
        Arc::new(FlakyStore::new()),
        trainer,
    )
    .await
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let options = LearnOptions {
        cancel: Some(cancel),
        ..Default::default()
    };
    let err = registry
        .learn_with_options("widget", samples(3), options)
        .await
        .unwrap_err();
    assert!(matches!(err, CounterError::TrainingCancelled(_)));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_store_failure_discards_artifact() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store.clone(), trainer.clone())
        .await
        .unwrap();

    store.fail_puts.store(true, Ordering::SeqCst);
    let err = registry.learn("widget", samples(3)).await.unwrap_err();
    assert!(matches!(err, CounterError::RegistryIo(_)));
    assert!(registry.is_empty().await);
    assert_eq!(trainer.discarded(), vec!["artifact://widget/1".to_string()]);
}

#[tokio::test]
async fn test_failed_relearn_keeps_previous_generation() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::new());
    let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store.clone(), trainer.clone())
        .await
        .unwrap();

    let first = registry.learn("widget", samples(3)).await.unwrap();
    trainer.fail.store(true, Ordering::SeqCst);
    assert!(registry.learn("widget", samples(5)).await.is_err());

    assert_eq!(registry.get("widget").await, Some(first));
    assert!(trainer.discarded().is_empty());
}

#[tokio::test]
async fn test_failed_relearn_keeps_shared_artifact() {
    let store = Arc::new(FlakyStore::new());
    let trainer = Arc::new(MockTrainer::reusing("models/widget_model.pt"));
    let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store.clone(), trainer.clone())
        .await
        .unwrap();

    let first = registry.learn("widget", samples(3)).await.unwrap();
    store.fail_puts.store(true, Ordering::SeqCst);
    let result = registry.learn("widget", samples(4)).await;
    assert!(matches!(result, Err(CounterError::RegistryIo(_))));

    assert_eq!(registry.get("widget").await, Some(first));
    assert!(trainer.discarded().is_empty());
}

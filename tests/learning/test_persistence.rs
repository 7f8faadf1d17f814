// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for registry persistence across restarts

use crate::common::{samples, FlakyStore, MockTrainer};
use fabstir_object_counter::learning::{
    BaseWeightsTrainer, LearnedCategoryRegistry, LearningConfig,
};
use fabstir_object_counter::storage::FileKeyValueStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_registry_reloads_from_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let trainer = Arc::new(MockTrainer::new());

    let learned = {
        let store = Arc::new(FileKeyValueStore::new(temp_dir.path()));
        let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store, trainer.clone())
            .await
            .unwrap();
        registry.learn("widget", samples(3)).await.unwrap();
        registry.learn("gadget", samples(4)).await.unwrap();
        registry.delete("gadget").await;
        registry.get("widget").await.unwrap()
    };

    let store = Arc::new(FileKeyValueStore::new(temp_dir.path()));
    let reloaded = LearnedCategoryRegistry::load(LearningConfig::default(), store, trainer)
        .await
        .unwrap();
    assert_eq!(reloaded.len().await, 1);
    assert_eq!(reloaded.get("widget").await, Some(learned));
}

#[tokio::test]
async fn test_empty_store_loads_empty_registry() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileKeyValueStore::new(temp_dir.path()));
    let registry = LearnedCategoryRegistry::load(LearningConfig::default(), store, Arc::new(MockTrainer::new()))
        .await
        .unwrap();
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_corrupt_registry_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("registry")).unwrap();
    std::fs::write(
        temp_dir.path().join("registry/learned_categories.json"),
        b"{broken",
    )
    .unwrap();

    let store = Arc::new(FileKeyValueStore::new(temp_dir.path()));
    let result =
        LearnedCategoryRegistry::load(LearningConfig::default(), store, Arc::new(MockTrainer::new()))
            .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_base_weights_trainer_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("weights/yolov8n.pt");
    std::fs::create_dir_all(base.parent().unwrap()).unwrap();
    std::fs::write(&base, b"base weights").unwrap();

    let config = LearningConfig {
        models_dir: temp_dir.path().join("models"),
        base_weights: base.clone(),
        ..Default::default()
    };
    let trainer = Arc::new(BaseWeightsTrainer::new(&config.base_weights, &config.models_dir));
    let store = Arc::new(FileKeyValueStore::new(temp_dir.path().join("store")));
    let registry = LearnedCategoryRegistry::load(config, store, trainer).await.unwrap();

    let category = registry.learn("widget", samples(3)).await.unwrap();
    assert!(std::path::Path::new(&category.artifact_ref).exists());
    assert!(temp_dir
        .path()
        .join("store")
        .join(&category.training_data_prefix)
        .join("training_002.jpg")
        .exists());

    assert!(registry.delete("widget").await);
    assert!(!std::path::Path::new(&category.artifact_ref).exists());
}

#[tokio::test]
async fn test_failed_relearn_keeps_base_weights_artifact() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("yolov8n.pt");
    std::fs::write(&base, b"base weights").unwrap();

    let config = LearningConfig {
        models_dir: temp_dir.path().join("models"),
        base_weights: base.clone(),
        ..Default::default()
    };
    let trainer = Arc::new(BaseWeightsTrainer::new(&config.base_weights, &config.models_dir));
    let store = Arc::new(FlakyStore::new());
    let registry = LearnedCategoryRegistry::load(config, store.clone(), trainer)
        .await
        .unwrap();

    let first = registry.learn("widget", samples(3)).await.unwrap();
    store.fail_puts.store(true, Ordering::SeqCst);
    assert!(registry.learn("widget", samples(4)).await.is_err());

    let registered = registry.get("widget").await.unwrap();
    assert_eq!(registered, first);
    assert!(std::path::Path::new(&registered.artifact_ref).exists());
    assert_eq!(std::fs::read_dir(temp_dir.path().join("models")).unwrap().count(), 1);
}

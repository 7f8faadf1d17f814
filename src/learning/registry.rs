// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Learned-category registry
//!
//! Per name the lifecycle is `absent -> learned -> absent`. The registry owns
//! all category metadata. It is loaded from the key-value store at startup and
//! written back after every mutation. Mutations are serialized by a single
//! writer lock; reads take a short read lock on the current snapshot.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::{CounterError, CounterResult};
use crate::learning::trainer::Trainer;
use crate::learning::types::{
    digest_samples, validate_category_name, CategoryStatus, DeletionReport, LearnedCategory,
    LearningConfig,
};
use crate::storage::{get_json, put_json, KeyValueStore};

pub const REGISTRY_KEY: &str = "registry/learned_categories.json";

/// Optional knobs for a learn call
#[derive(Debug, Clone, Default)]
pub struct LearnOptions {
    /// Overrides `LearningConfig::default_confidence_threshold`
    pub confidence_threshold: Option<f32>,
    /// Cancels an in-flight training run
    pub cancel: Option<CancellationToken>,
}

pub struct LearnedCategoryRegistry {
    config: LearningConfig,
    store: Arc<dyn KeyValueStore>,
    trainer: Arc<dyn Trainer>,
    categories: RwLock<BTreeMap<String, LearnedCategory>>,
    writer: Mutex<()>,
}

impl LearnedCategoryRegistry {
    /// Load the registry from the store
    pub async fn load(
        config: LearningConfig,
        store: Arc<dyn KeyValueStore>,
        trainer: Arc<dyn Trainer>,
    ) -> CounterResult<Self> {
        config.validate().map_err(CounterError::Validation)?;
        let categories: BTreeMap<String, LearnedCategory> =
            get_json(store.as_ref(), REGISTRY_KEY).await?.unwrap_or_default();

        info!("📚 Loaded {} learned categories", categories.len());

        Ok(Self {
            config,
            store,
            trainer,
            categories: RwLock::new(categories),
            writer: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Register (or re-register) a category from training samples
    pub async fn learn(&self, name: &str, samples: Vec<Vec<u8>>) -> CounterResult<LearnedCategory> {
        self.learn_with_options(name, samples, LearnOptions::default())
            .await
    }

    pub async fn learn_with_options(
        &self,
        name: &str,
        samples: Vec<Vec<u8>>,
        options: LearnOptions,
    ) -> CounterResult<LearnedCategory> {
        validate_category_name(name)?;
        if samples.len() < self.config.min_training_samples {
            return Err(CounterError::Validation(format!(
                "At least {} training images are required for few-shot learning, got {}",
                self.config.min_training_samples,
                samples.len()
            )));
        }
        let confidence_threshold = options
            .confidence_threshold
            .unwrap_or(self.config.default_confidence_threshold);
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(CounterError::Validation(format!(
                "Confidence threshold must be within [0, 1], got {}",
                confidence_threshold
            )));
        }

        // Training runs outside every lock
        let artifact_ref = self.train(name, &samples, options.cancel.as_ref()).await?;

        let created_at = Utc::now();
        let sample_digest = digest_samples(&samples);
        let training_data_prefix = format!(
            "training/{}/{}-{}/",
            name,
            created_at.timestamp_millis(),
            &sample_digest[..12]
        );

        if let Err(e) = self.store_samples(&training_data_prefix, &samples).await {
            error!("❌ Failed to store training samples for '{}': {}", name, e);
            self.rollback(name, &artifact_ref, &training_data_prefix).await;
            return Err(e);
        }

        let category = LearnedCategory {
            name: name.to_string(),
            artifact_ref,
            sample_count: samples.len(),
            confidence_threshold,
            sample_digest,
            training_data_prefix,
            created_at,
            status: CategoryStatus::Learned,
        };

        let previous = {
            let writer = self.writer.lock().await;
            let mut next = self.categories.read().await.clone();
            let previous = next.insert(name.to_string(), category.clone());

            if let Err(e) = put_json(self.store.as_ref(), REGISTRY_KEY, &next).await {
                error!("❌ Failed to persist registry after learning '{}': {}", name, e);
                drop(writer);
                self.rollback(name, &category.artifact_ref, &category.training_data_prefix)
                    .await;
                return Err(e.into());
            }

            *self.categories.write().await = next;
            drop(writer);
            previous
        };

        if let Some(previous) = previous {
            debug!("Replacing previous generation of '{}'", name);
            let mut failures = Vec::new();
            self.cleanup(&previous, Some(&category), &mut failures).await;
        }

        info!(
            "✅ Learned '{}' from {} samples ({})",
            name, category.sample_count, category.artifact_ref
        );
        Ok(category)
    }

    async fn train(
        &self,
        name: &str,
        samples: &[Vec<u8>],
        cancel: Option<&CancellationToken>,
    ) -> CounterResult<String> {
        let timeout = self.config.training_timeout;
        let training = tokio::time::timeout(timeout, self.trainer.train(name, samples));

        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => {
                    warn!("⚠️ Training for '{}' cancelled", name);
                    return Err(CounterError::TrainingCancelled(name.to_string()));
                }
                outcome = training => outcome,
            },
            None => training.await,
        };

        match outcome {
            Ok(Ok(artifact_ref)) => Ok(artifact_ref),
            Ok(Err(e)) => Err(CounterError::TrainingFailed {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!("⚠️ Training for '{}' timed out after {:?}", name, timeout);
                Err(CounterError::TrainingTimedOut {
                    name: name.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn store_samples(&self, prefix: &str, samples: &[Vec<u8>]) -> CounterResult<()> {
        for (index, sample) in samples.iter().enumerate() {
            let key = format!("{}training_{:03}.jpg", prefix, index);
            self.store.put(&key, sample).await?;
        }
        Ok(())
    }

    /// Undo a learn that failed after the artifact was produced.
    /// Anything the registered generation of `name` still references is kept.
    async fn rollback(&self, name: &str, artifact_ref: &str, prefix: &str) {
        let registered = self.get(name).await;
        let shared_artifact = registered
            .as_ref()
            .is_some_and(|c| c.artifact_ref == artifact_ref);
        let shared_prefix = registered
            .as_ref()
            .is_some_and(|c| c.training_data_prefix == prefix);

        if shared_artifact {
            debug!("Keeping artifact {} still registered for '{}'", artifact_ref, name);
        } else if let Err(e) = self.trainer.discard(artifact_ref).await {
            warn!("⚠️ Failed to discard artifact {}: {}", artifact_ref, e);
        }

        if shared_prefix {
            return;
        }
        if let Err(e) = self.store.delete_prefix(prefix).await {
            warn!("⚠️ Failed to remove training data {}: {}", prefix, e);
        }
    }

    /// Best-effort removal of a category's artifact and training data.
    /// Anything shared with `current` is left in place.
    async fn cleanup(
        &self,
        category: &LearnedCategory,
        current: Option<&LearnedCategory>,
        failures: &mut Vec<String>,
    ) {
        let shared_artifact = current.is_some_and(|c| c.artifact_ref == category.artifact_ref);
        let shared_prefix =
            current.is_some_and(|c| c.training_data_prefix == category.training_data_prefix);

        if !shared_artifact {
            if let Err(e) = self.trainer.discard(&category.artifact_ref).await {
                warn!(
                    "⚠️ Failed to discard artifact {} for '{}': {}",
                    category.artifact_ref, category.name, e
                );
                failures.push(format!("artifact {}: {}", category.artifact_ref, e));
            }
        }

        if shared_prefix {
            return;
        }
        if let Err(e) = self.store.delete_prefix(&category.training_data_prefix).await {
            warn!(
                "⚠️ Failed to remove training data for '{}': {}",
                category.name, e
            );
            failures.push(format!("training data {}: {}", category.training_data_prefix, e));
        }
    }

    pub async fn get(&self, name: &str) -> Option<LearnedCategory> {
        self.categories.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.categories.read().await.contains_key(name)
    }

    pub async fn list(&self) -> BTreeSet<String> {
        self.categories.read().await.keys().cloned().collect()
    }

    /// Snapshot of every registered category
    pub async fn entries(&self) -> Vec<LearnedCategory> {
        self.categories.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.categories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.categories.read().await.is_empty()
    }

    /// Delete a category, returning false if it was not registered
    pub async fn delete(&self, name: &str) -> bool {
        self.delete_with_report(name).await.removed
    }

    /// Delete a category and report secondary cleanup failures.
    ///
    /// The entry is removed from the registry even if persisting the registry
    /// or removing the artifact and training data fails.
    pub async fn delete_with_report(&self, name: &str) -> DeletionReport {
        let mut report = DeletionReport {
            name: name.to_string(),
            ..Default::default()
        };

        let removed = {
            let _writer = self.writer.lock().await;
            let mut next = self.categories.read().await.clone();
            let Some(removed) = next.remove(name) else {
                debug!("Delete requested for unknown category '{}'", name);
                return report;
            };

            if let Err(e) = put_json(self.store.as_ref(), REGISTRY_KEY, &next).await {
                error!(
                    "❌ Failed to persist registry after deleting '{}': {}",
                    name, e
                );
                report.cleanup_failures.push(format!("registry: {}", e));
            }

            *self.categories.write().await = next;
            removed
        };
        report.removed = true;

        self.cleanup(&removed, None, &mut report.cleanup_failures)
            .await;

        if report.is_clean() {
            info!("🗑️ Deleted learned category '{}'", name);
        } else {
            warn!(
                "⚠️ Deleted learned category '{}' with {} cleanup failures",
                name,
                report.cleanup_failures.len()
            );
        }
        report
    }
}

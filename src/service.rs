// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object counting service
//!
//! Wires the safety gate, detector, count aggregator, learned-category
//! registry and accuracy estimator together. Every image passes the safety
//! gate before the detector sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CounterConfig;
use crate::detection::{
    is_known_object_type, CocoCategoryMapper, CountAggregator, CountResult, Detector,
    LearnedCategoryMapper, RawDetection,
};
use crate::errors::{CounterError, CounterResult};
use crate::learning::{
    DeletionReport, LearnOptions, LearnedCategory, LearnedCategoryRegistry, Trainer,
};
use crate::monitoring::{
    MetricsSink, LEARNED_CATEGORIES_TOTAL, MODEL_ACCURACY, MODEL_CONFIDENCE_SCORE,
    MODEL_PRECISION, MODEL_RECALL, OBJECTS_DETECTED_COUNT, SAFETY_BLOCKS_TOTAL,
    SAFETY_CHECKS_TOTAL, SAFETY_DETECTION_CONFIDENCE,
};
use crate::qa::{AccuracyEstimator, AccuracyReport};
use crate::safety::{
    HeuristicScorer, SafetyEngine, SafetyStatisticsSnapshot, SafetyVerdict,
};
use crate::storage::KeyValueStore;

/// External capabilities the service is built from
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn Detector>,
    pub scorer: Arc<dyn HeuristicScorer>,
    pub trainer: Arc<dyn Trainer>,
    pub store: Arc<dyn KeyValueStore>,
    pub metrics: Arc<dyn MetricsSink>,
}

/// One image submitted for counting
#[derive(Debug, Clone)]
pub struct CountRequest {
    pub image: Vec<u8>,
    pub object_type: String,
    pub filename_hint: Option<String>,
}

impl CountRequest {
    pub fn new(image: Vec<u8>, object_type: impl Into<String>) -> Self {
        Self {
            image,
            object_type: object_type.into(),
            filename_hint: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename_hint = Some(filename.into());
        self
    }
}

/// Safety verdict plus the count, which is absent when the gate blocked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountOutcome {
    pub verdict: SafetyVerdict,
    pub result: Option<CountResult>,
}

impl CountOutcome {
    pub fn is_blocked(&self) -> bool {
        self.verdict.is_blocked()
    }
}

/// Count produced with a learned category's artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedCountOutcome {
    pub outcome: CountOutcome,
    pub training_samples: usize,
    pub learned_at: DateTime<Utc>,
}

pub struct ObjectCounterService {
    config: CounterConfig,
    aggregator: CountAggregator,
    safety: SafetyEngine,
    detector: Arc<dyn Detector>,
    scorer: Arc<dyn HeuristicScorer>,
    registry: LearnedCategoryRegistry,
    estimator: AccuracyEstimator,
    metrics: Arc<dyn MetricsSink>,
}

impl ObjectCounterService {
    /// Validate the configuration and load persisted registry and correction state
    pub async fn new(config: CounterConfig, collaborators: Collaborators) -> CounterResult<Self> {
        config.validate().map_err(CounterError::Validation)?;

        let registry = LearnedCategoryRegistry::load(
            config.learning.clone(),
            collaborators.store.clone(),
            collaborators.trainer,
        )
        .await?;
        let estimator =
            AccuracyEstimator::load(config.accuracy.clone(), collaborators.store).await?;

        collaborators.metrics.set_gauge(
            LEARNED_CATEGORIES_TOTAL,
            registry.len().await as f64,
            &[],
        );

        info!(
            "✅ Object counter ready (detector: {})",
            collaborators.detector.model_name()
        );

        Ok(Self {
            aggregator: CountAggregator::new(config.aggregation.clone()),
            safety: SafetyEngine::new(config.safety.clone()),
            config,
            detector: collaborators.detector,
            scorer: collaborators.scorer,
            registry,
            estimator,
            metrics: collaborators.metrics,
        })
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn safety_engine(&self) -> &SafetyEngine {
        &self.safety
    }

    pub fn registry(&self) -> &LearnedCategoryRegistry {
        &self.registry
    }

    pub fn estimator(&self) -> &AccuracyEstimator {
        &self.estimator
    }

    /// Aggregate detector output already in hand
    pub fn aggregate_count(&self, detections: &[RawDetection], target_type: &str) -> CountResult {
        let result = self.aggregator.aggregate(detections, target_type);
        self.record_count_metrics(&result, "external");
        result
    }

    /// Apply the safety rules to an already computed heuristic score
    pub fn check_safety(
        &self,
        heuristic_score: f32,
        object_type: &str,
        filename_hint: Option<&str>,
    ) -> SafetyVerdict {
        let verdict = self
            .safety
            .evaluate(heuristic_score, object_type, filename_hint);
        self.record_safety_metrics(&verdict, object_type);
        verdict
    }

    /// Score the image and apply the safety rules
    pub async fn screen_image(
        &self,
        image: &[u8],
        object_type: &str,
        filename_hint: Option<&str>,
    ) -> SafetyVerdict {
        let verdict = self
            .safety
            .check(self.scorer.as_ref(), image, object_type, filename_hint)
            .await;
        self.record_safety_metrics(&verdict, object_type);
        verdict
    }

    /// Count objects of a built-in type in one image
    pub async fn count_objects(&self, request: &CountRequest) -> CounterResult<CountOutcome> {
        let object_type = request.object_type.trim();
        if !is_known_object_type(object_type) {
            return Err(CounterError::UnsupportedObjectType(
                request.object_type.clone(),
            ));
        }

        let verdict = self
            .screen_image(&request.image, object_type, request.filename_hint.as_deref())
            .await;
        if verdict.is_blocked() {
            return Ok(CountOutcome {
                verdict,
                result: None,
            });
        }

        let result = self
            .aggregator
            .detect_and_aggregate(
                self.detector.as_ref(),
                &CocoCategoryMapper,
                &request.image,
                None,
                object_type,
            )
            .await;
        self.record_count_metrics(&result, self.detector.model_name());

        Ok(CountOutcome {
            verdict,
            result: Some(result),
        })
    }

    /// Count a learned category using its trained artifact
    pub async fn count_learned(
        &self,
        image: &[u8],
        name: &str,
        filename_hint: Option<&str>,
    ) -> CounterResult<LearnedCountOutcome> {
        let category = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| CounterError::CategoryNotLearned(name.to_string()))?;

        let verdict = self.screen_image(image, name, filename_hint).await;
        let result = if verdict.is_blocked() {
            None
        } else {
            let mapper = LearnedCategoryMapper::new(&category.name);
            let result = self
                .aggregator
                .detect_and_aggregate(
                    self.detector.as_ref(),
                    &mapper,
                    image,
                    Some(&category.artifact_ref),
                    &category.name,
                )
                .await;
            self.record_count_metrics(&result, self.detector.model_name());
            Some(result)
        };

        Ok(LearnedCountOutcome {
            outcome: CountOutcome { verdict, result },
            training_samples: category.sample_count,
            learned_at: category.created_at,
        })
    }

    pub async fn learn_category(
        &self,
        name: &str,
        samples: Vec<Vec<u8>>,
        options: LearnOptions,
    ) -> CounterResult<LearnedCategory> {
        let category = self
            .registry
            .learn_with_options(name, samples, options)
            .await?;
        self.update_category_gauge().await;
        Ok(category)
    }

    pub async fn get_category(&self, name: &str) -> Option<LearnedCategory> {
        self.registry.get(name).await
    }

    pub async fn list_categories(&self) -> BTreeSet<String> {
        self.registry.list().await
    }

    pub async fn delete_category(&self, name: &str) -> DeletionReport {
        let report = self.registry.delete_with_report(name).await;
        if report.removed {
            self.update_category_gauge().await;
        }
        report
    }

    pub async fn record_correction(
        &self,
        object_type: &str,
        predicted_count: u32,
        corrected_count: u32,
    ) -> CounterResult<AccuracyReport> {
        let report = self
            .estimator
            .record(object_type, predicted_count, corrected_count)
            .await?;
        if let Some(stat) = report.stat() {
            let labels = [("object_type", object_type)];
            self.metrics.set_gauge(MODEL_ACCURACY, stat.accuracy_pct, &labels);
            self.metrics.set_gauge(MODEL_PRECISION, stat.precision_pct, &labels);
            self.metrics.set_gauge(MODEL_RECALL, stat.recall_pct, &labels);
        }
        Ok(report)
    }

    pub async fn get_accuracy(&self, object_type: &str) -> AccuracyReport {
        self.estimator.accuracy(object_type).await
    }

    pub fn safety_statistics(&self) -> SafetyStatisticsSnapshot {
        self.safety.get_statistics()
    }

    pub fn reset_safety_statistics(&self) {
        self.safety.reset_statistics();
    }

    async fn update_category_gauge(&self) {
        let total = self.registry.len().await;
        self.metrics
            .set_gauge(LEARNED_CATEGORIES_TOTAL, total as f64, &[]);
    }

    fn record_safety_metrics(&self, verdict: &SafetyVerdict, object_type: &str) {
        self.metrics.increment_counter(SAFETY_CHECKS_TOTAL, 1.0, &[]);
        self.metrics.observe_histogram(
            SAFETY_DETECTION_CONFIDENCE,
            verdict.signals.heuristic_score as f64,
            &[],
        );
        if let Some(rule) = verdict.rule.filter(|_| verdict.is_blocked()) {
            self.metrics.increment_counter(
                SAFETY_BLOCKS_TOTAL,
                1.0,
                &[("object_type", object_type), ("reason", rule.as_str())],
            );
        }
    }

    fn record_count_metrics(&self, result: &CountResult, model_name: &str) {
        debug!(
            "Counted {} '{}' (confidence {:.3}, {} detections)",
            result.count,
            result.target_type,
            result.confidence,
            result.total_detections()
        );
        self.metrics.observe_histogram(
            OBJECTS_DETECTED_COUNT,
            result.count as f64,
            &[("object_type", result.target_type.as_str())],
        );
        self.metrics.observe_histogram(
            MODEL_CONFIDENCE_SCORE,
            result.confidence as f64,
            &[
                ("object_type", result.target_type.as_str()),
                ("model_name", model_name),
            ],
        );
    }
}

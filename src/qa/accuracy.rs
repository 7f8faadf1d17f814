// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Running count accuracy per object type, derived from user corrections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{CounterError, CounterResult};
use crate::storage::{get_json, put_json, KeyValueStore};

pub const CORRECTIONS_KEY: &str = "corrections/history.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyConfig {
    /// Corrections needed before a statistic is reported
    pub min_samples: usize,
}

impl Default for AccuracyConfig {
    fn default() -> Self {
        Self { min_samples: 2 }
    }
}

impl AccuracyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_samples < 1 {
            return Err("min_samples must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub object_type: String,
    pub predicted_count: u32,
    pub corrected_count: u32,
    pub recorded_at: DateTime<Utc>,
}

impl CorrectionRecord {
    pub fn is_exact(&self) -> bool {
        self.predicted_count == self.corrected_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStat {
    pub object_type: String,
    pub accuracy_pct: f64,
    /// Same as accuracy: one count per image, so there is no separate
    /// false-positive/false-negative split
    pub precision_pct: f64,
    pub recall_pct: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccuracyReport {
    InsufficientData { samples: usize, required: usize },
    Ready(AccuracyStat),
}

impl AccuracyReport {
    pub fn stat(&self) -> Option<&AccuracyStat> {
        match self {
            AccuracyReport::Ready(stat) => Some(stat),
            AccuracyReport::InsufficientData { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.stat().is_some()
    }
}

type History = BTreeMap<String, Vec<CorrectionRecord>>;

pub struct AccuracyEstimator {
    config: AccuracyConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    history: Mutex<History>,
}

impl AccuracyEstimator {
    /// Estimator without persistence
    pub fn new(config: AccuracyConfig) -> Self {
        Self {
            config,
            store: None,
            history: Mutex::new(History::new()),
        }
    }

    /// Estimator backed by `store`, reloading any saved history
    pub async fn load(config: AccuracyConfig, store: Arc<dyn KeyValueStore>) -> CounterResult<Self> {
        let history: History = get_json(store.as_ref(), CORRECTIONS_KEY)
            .await?
            .unwrap_or_default();

        info!(
            "📈 Loaded correction history for {} object types",
            history.len()
        );

        Ok(Self {
            config,
            store: Some(store),
            history: Mutex::new(history),
        })
    }

    pub fn config(&self) -> &AccuracyConfig {
        &self.config
    }

    /// Append a correction and return the recomputed statistic.
    ///
    /// The record is only kept once it has been persisted.
    pub async fn record(
        &self,
        object_type: &str,
        predicted_count: u32,
        corrected_count: u32,
    ) -> CounterResult<AccuracyReport> {
        if object_type.trim().is_empty() {
            return Err(CounterError::Validation(
                "Object type is required".to_string(),
            ));
        }

        let record = CorrectionRecord {
            object_type: object_type.to_string(),
            predicted_count,
            corrected_count,
            recorded_at: Utc::now(),
        };

        let mut history = self.history.lock().await;
        match &self.store {
            Some(store) => {
                let mut next = history.clone();
                next.entry(object_type.to_string())
                    .or_default()
                    .push(record);
                put_json(store.as_ref(), CORRECTIONS_KEY, &next).await?;
                *history = next;
            }
            None => history
                .entry(object_type.to_string())
                .or_default()
                .push(record),
        }

        debug!(
            "Recorded correction for '{}': predicted {}, corrected {}",
            object_type, predicted_count, corrected_count
        );

        Ok(self.compute(object_type, history.get(object_type).map(Vec::as_slice)))
    }

    pub async fn accuracy(&self, object_type: &str) -> AccuracyReport {
        let history = self.history.lock().await;
        self.compute(object_type, history.get(object_type).map(Vec::as_slice))
    }

    pub async fn history(&self, object_type: &str) -> Vec<CorrectionRecord> {
        self.history
            .lock()
            .await
            .get(object_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Object types with at least one correction
    pub async fn object_types(&self) -> Vec<String> {
        self.history.lock().await.keys().cloned().collect()
    }

    fn compute(&self, object_type: &str, records: Option<&[CorrectionRecord]>) -> AccuracyReport {
        let records = records.unwrap_or_default();
        if records.len() < self.config.min_samples || records.is_empty() {
            return AccuracyReport::InsufficientData {
                samples: records.len(),
                required: self.config.min_samples,
            };
        }

        let exact = records.iter().filter(|r| r.is_exact()).count();
        let accuracy_pct = exact as f64 / records.len() as f64 * 100.0;

        AccuracyReport::Ready(AccuracyStat {
            object_type: object_type.to_string(),
            accuracy_pct,
            precision_pct: accuracy_pct,
            recall_pct: accuracy_pct,
            sample_count: records.len(),
        })
    }
}

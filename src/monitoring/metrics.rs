// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Metrics sink boundary and its Prometheus implementation
//!
//! Metrics emitted by the service:
//! - `safety_checks_total` - Counter of safety checks
//! - `safety_blocks_total{object_type,reason}` - Counter of blocked requests
//! - `safety_detection_confidence` - Histogram of heuristic scores
//! - `objects_detected_count{object_type}` - Histogram of counts per request
//! - `model_confidence_score{object_type,model_name}` - Histogram of count confidence
//! - `model_accuracy{object_type}` / `model_precision` / `model_recall` - Gauges, percent
//! - `learned_categories_total` - Gauge of registered learned categories

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

pub const SAFETY_CHECKS_TOTAL: &str = "safety_checks_total";
pub const SAFETY_BLOCKS_TOTAL: &str = "safety_blocks_total";
pub const SAFETY_DETECTION_CONFIDENCE: &str = "safety_detection_confidence";
pub const OBJECTS_DETECTED_COUNT: &str = "objects_detected_count";
pub const MODEL_CONFIDENCE_SCORE: &str = "model_confidence_score";
pub const MODEL_ACCURACY: &str = "model_accuracy";
pub const MODEL_PRECISION: &str = "model_precision";
pub const MODEL_RECALL: &str = "model_recall";
pub const LEARNED_CATEGORIES_TOTAL: &str = "learned_categories_total";

pub type Labels<'a> = &'a [(&'a str, &'a str)];

/// Where the service reports its metrics. Calls must be cheap and never fail
/// the caller.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &str, value: f64, labels: Labels<'_>);
    fn observe_histogram(&self, name: &str, value: f64, labels: Labels<'_>);
    fn set_gauge(&self, name: &str, value: f64, labels: Labels<'_>);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment_counter(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}
    fn observe_histogram(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}
    fn set_gauge(&self, _name: &str, _value: f64, _labels: Labels<'_>) {}
}

fn help_for(name: &str) -> &'static str {
    match name {
        SAFETY_CHECKS_TOTAL => "Total safety checks performed",
        SAFETY_BLOCKS_TOTAL => "Total requests blocked by the safety engine",
        SAFETY_DETECTION_CONFIDENCE => "Heuristic sensitive-content score per check",
        OBJECTS_DETECTED_COUNT => "Objects counted per request",
        MODEL_CONFIDENCE_SCORE => "Aggregate count confidence per request",
        MODEL_ACCURACY => "Count accuracy percentage from corrections",
        MODEL_PRECISION => "Count precision percentage from corrections",
        MODEL_RECALL => "Count recall percentage from corrections",
        LEARNED_CATEGORIES_TOTAL => "Learned categories currently registered",
        _ => "Object counter metric",
    }
}

/// Label names and values ordered by name
fn split_labels<'a>(labels: Labels<'a>) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut sorted = labels.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted.into_iter().unzip()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registers metric families lazily, keyed by name; the label set of the
/// first call fixes the family's label names.
pub struct PrometheusMetricsSink {
    registry: Registry,
    counters: Mutex<HashMap<String, CounterVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
    gauges: Mutex<HashMap<String, GaugeVec>>,
}

impl PrometheusMetricsSink {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn counter_vec(&self, name: &str, label_names: &[&str]) -> Result<CounterVec, prometheus::Error> {
        let mut counters = lock(&self.counters);
        if let Some(existing) = counters.get(name) {
            return Ok(existing.clone());
        }
        let vec = CounterVec::new(Opts::new(name, help_for(name)), label_names)?;
        self.registry.register(Box::new(vec.clone()))?;
        counters.insert(name.to_string(), vec.clone());
        Ok(vec)
    }

    fn histogram_vec(
        &self,
        name: &str,
        label_names: &[&str],
    ) -> Result<HistogramVec, prometheus::Error> {
        let mut histograms = lock(&self.histograms);
        if let Some(existing) = histograms.get(name) {
            return Ok(existing.clone());
        }
        let vec = HistogramVec::new(HistogramOpts::new(name, help_for(name)), label_names)?;
        self.registry.register(Box::new(vec.clone()))?;
        histograms.insert(name.to_string(), vec.clone());
        Ok(vec)
    }

    fn gauge_vec(&self, name: &str, label_names: &[&str]) -> Result<GaugeVec, prometheus::Error> {
        let mut gauges = lock(&self.gauges);
        if let Some(existing) = gauges.get(name) {
            return Ok(existing.clone());
        }
        let vec = GaugeVec::new(Opts::new(name, help_for(name)), label_names)?;
        self.registry.register(Box::new(vec.clone()))?;
        gauges.insert(name.to_string(), vec.clone());
        Ok(vec)
    }
}

impl Default for PrometheusMetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn increment_counter(&self, name: &str, value: f64, labels: Labels<'_>) {
        let (names, values) = split_labels(labels);
        let result = self
            .counter_vec(name, &names)
            .and_then(|vec| vec.get_metric_with_label_values(&values))
            .map(|counter| counter.inc_by(value));
        if let Err(e) = result {
            warn!("Failed to record counter {}: {}", name, e);
        }
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: Labels<'_>) {
        let (names, values) = split_labels(labels);
        let result = self
            .histogram_vec(name, &names)
            .and_then(|vec| vec.get_metric_with_label_values(&values))
            .map(|histogram| histogram.observe(value));
        if let Err(e) = result {
            warn!("Failed to record histogram {}: {}", name, e);
        }
    }

    fn set_gauge(&self, name: &str, value: f64, labels: Labels<'_>) {
        let (names, values) = split_labels(labels);
        let result = self
            .gauge_vec(name, &names)
            .and_then(|vec| vec.get_metric_with_label_values(&values))
            .map(|gauge| gauge.set(value));
        if let Err(e) = result {
            warn!("Failed to record gauge {}: {}", name, e);
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-lifetime safety counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::safety::types::{BlockRule, SafetyVerdict, TextRiskLevel};

/// Running safety statistics. Cloning shares the underlying counters.
#[derive(Debug, Clone, Default)]
pub struct SafetyStatistics {
    /// Number of safety evaluations
    total_checks: Arc<AtomicU64>,
    allowed: Arc<AtomicU64>,
    blocked: Arc<AtomicU64>,
    type_blocklist_blocks: Arc<AtomicU64>,
    visual_signal_blocks: Arc<AtomicU64>,
    text_risk_blocks: Arc<AtomicU64>,
    /// Scorer failures that were allowed through
    check_failures: Arc<AtomicU64>,
    /// Evaluations whose text analysis came back high risk, whichever rule fired
    high_text_risk: Arc<AtomicU64>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyStatisticsSnapshot {
    pub total_checks: u64,
    pub allowed: u64,
    pub blocked: u64,
    pub type_blocklist_blocks: u64,
    pub visual_signal_blocks: u64,
    pub text_risk_blocks: u64,
    pub check_failures: u64,
    pub high_text_risk: u64,
    pub block_rate: f64,
}

impl SafetyStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, verdict: &SafetyVerdict) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);

        if verdict.signals.text_risk_level == TextRiskLevel::High {
            self.high_text_risk.fetch_add(1, Ordering::Relaxed);
        }
        if verdict.check_failed {
            self.check_failures.fetch_add(1, Ordering::Relaxed);
        }

        if verdict.allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.blocked.fetch_add(1, Ordering::Relaxed);
        let counter = match verdict.rule {
            Some(BlockRule::TypeBlocklist) => &self.type_blocklist_blocks,
            Some(BlockRule::VisualSignal) => &self.visual_signal_blocks,
            Some(BlockRule::TextRisk) | None => &self.text_risk_blocks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SafetyStatisticsSnapshot {
        let total_checks = self.total_checks.load(Ordering::Relaxed);
        let blocked = self.blocked.load(Ordering::Relaxed);

        SafetyStatisticsSnapshot {
            total_checks,
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked,
            type_blocklist_blocks: self.type_blocklist_blocks.load(Ordering::Relaxed),
            visual_signal_blocks: self.visual_signal_blocks.load(Ordering::Relaxed),
            text_risk_blocks: self.text_risk_blocks.load(Ordering::Relaxed),
            check_failures: self.check_failures.load(Ordering::Relaxed),
            high_text_risk: self.high_text_risk.load(Ordering::Relaxed),
            block_rate: blocked as f64 / total_checks.max(1) as f64,
        }
    }

    pub fn reset(&self) {
        self.total_checks.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        self.type_blocklist_blocks.store(0, Ordering::Relaxed);
        self.visual_signal_blocks.store(0, Ordering::Relaxed);
        self.text_risk_blocks.store(0, Ordering::Relaxed);
        self.check_failures.store(0, Ordering::Relaxed);
        self.high_text_risk.store(0, Ordering::Relaxed);
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rule-ordered safety decision engine
//!
//! Rules are evaluated in order and the first match wins:
//! 1. Type blocklist on the requested object type (hard override)
//! 2. Heuristic visual score at or above the block threshold
//! 3. High text risk from the keyword taxonomy
//! 4. Allow
//!
//! Policy matches fail closed. When the scorer fails, rules 1 and 3 still
//! apply; a request neither of them blocks is allowed with reason "check failed".

use tracing::{debug, info, warn};

use crate::safety::heuristic::HeuristicScorer;
use crate::safety::keywords::{analyze_object_type, TextAnalysis};
use crate::safety::statistics::{SafetyStatistics, SafetyStatisticsSnapshot};
use crate::safety::types::{
    BlockRule, SafetyConfig, SafetySignals, SafetyVerdict, TextRiskLevel, REASON_TYPE_BLOCKLIST,
    REASON_VISUAL_SIGNAL,
};

pub struct SafetyEngine {
    config: SafetyConfig,
    stats: SafetyStatistics,
}

impl SafetyEngine {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            stats: SafetyStatistics::new(),
        }
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Keyword analysis of a requested object type
    pub fn analyze_object_type(&self, object_type: &str) -> TextAnalysis {
        analyze_object_type(&self.config.keyword_groups, object_type)
    }

    /// First blocklist term contained in the object type
    fn blocklisted_term(&self, object_type: &str) -> Option<&str> {
        let lower = object_type.to_lowercase();
        self.config
            .blocked_type_terms
            .iter()
            .find(|term| lower.contains(&term.to_lowercase()))
            .map(String::as_str)
    }

    /// Apply the rule chain to an already computed heuristic score
    pub fn evaluate(
        &self,
        heuristic_score: f32,
        object_type: &str,
        filename_hint: Option<&str>,
    ) -> SafetyVerdict {
        let verdict = self.decide(heuristic_score, object_type);
        self.finish(verdict, object_type, filename_hint)
    }

    /// Score the image with `scorer`, then apply the rule chain.
    ///
    /// The scorer runs without any lock held. If it fails, the rules that need
    /// no score still apply; only a request none of them blocks fails open.
    pub async fn check(
        &self,
        scorer: &dyn HeuristicScorer,
        image: &[u8],
        object_type: &str,
        filename_hint: Option<&str>,
    ) -> SafetyVerdict {
        match scorer.score(image, filename_hint).await {
            Ok(score) => self.evaluate(score, object_type, filename_hint),
            Err(e) => {
                let signals = self.signals(0.0, object_type);
                if let Some((rule, reason)) = self.blocking_rule(None, object_type, &signals) {
                    warn!("⚠️ Safety scorer failed for '{}': {}", object_type, e);
                    let mut verdict = SafetyVerdict::block(rule, reason, 0.0, signals);
                    verdict.check_failed = true;
                    return self.finish(verdict, object_type, filename_hint);
                }

                warn!(
                    "⚠️ Safety check failed for '{}', allowing request: {}",
                    object_type, e
                );
                let verdict = SafetyVerdict::fail_open();
                self.stats.record(&verdict);
                verdict
            }
        }
    }

    fn finish(
        &self,
        verdict: SafetyVerdict,
        object_type: &str,
        filename_hint: Option<&str>,
    ) -> SafetyVerdict {
        self.stats.record(&verdict);

        if verdict.allowed {
            debug!(
                "Safety check passed for '{}' (score {:.2}, file {:?})",
                object_type, verdict.signals.heuristic_score, filename_hint
            );
        } else {
            info!(
                "🚫 Blocked request for '{}' (file {:?}): {}",
                object_type,
                filename_hint,
                verdict.reason.as_deref().unwrap_or_default()
            );
        }

        verdict
    }

    fn decide(&self, heuristic_score: f32, object_type: &str) -> SafetyVerdict {
        let score = if heuristic_score.is_nan() {
            warn!("Heuristic score is NaN, treating as 0.0");
            0.0
        } else {
            heuristic_score.clamp(0.0, 1.0)
        };

        let signals = self.signals(score, object_type);
        match self.blocking_rule(Some(score), object_type, &signals) {
            Some((rule, reason)) => SafetyVerdict::block(rule, reason, score, signals),
            None => SafetyVerdict::allow(score, signals),
        }
    }

    fn signals(&self, score: f32, object_type: &str) -> SafetySignals {
        let analysis = self.analyze_object_type(object_type);
        SafetySignals {
            heuristic_score: score,
            text_risk_level: analysis.risk_level,
            detected_keywords: analysis.detected_keywords,
        }
    }

    /// First matching block rule. The visual rule is skipped without a score.
    fn blocking_rule(
        &self,
        score: Option<f32>,
        object_type: &str,
        signals: &SafetySignals,
    ) -> Option<(BlockRule, String)> {
        if let Some(term) = self.blocklisted_term(object_type) {
            debug!("Object type '{}' matched blocklist term '{}'", object_type, term);
            return Some((BlockRule::TypeBlocklist, REASON_TYPE_BLOCKLIST.to_string()));
        }

        if let Some(score) = score {
            if score >= self.config.heuristic_block_threshold {
                return Some((BlockRule::VisualSignal, REASON_VISUAL_SIGNAL.to_string()));
            }
        }

        if signals.text_risk_level == TextRiskLevel::High {
            let keywords: Vec<&str> = signals.detected_keywords.iter().map(String::as_str).collect();
            let reason = format!("sensitive keywords in object type: {}", keywords.join(", "));
            return Some((BlockRule::TextRisk, reason));
        }

        None
    }

    pub fn get_statistics(&self) -> SafetyStatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }
}

impl Default for SafetyEngine {
    fn default() -> Self {
        Self::new(SafetyConfig::default())
    }
}

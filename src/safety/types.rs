// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Safety verdict types and policy configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::safety::keywords::{default_keyword_groups, KeywordGroup};

pub const REASON_TYPE_BLOCKLIST: &str = "sensitive object type requested";
pub const REASON_VISUAL_SIGNAL: &str = "high-confidence sensitive-content detection";
pub const REASON_CHECK_FAILED: &str = "check failed";

/// Risk level derived from keyword analysis of the requested object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRiskLevel {
    Low,
    High,
}

impl Default for TextRiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// Rule of the decision chain that blocked a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRule {
    TypeBlocklist,
    VisualSignal,
    TextRisk,
}

impl BlockRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockRule::TypeBlocklist => "type_blocklist",
            BlockRule::VisualSignal => "visual_signal",
            BlockRule::TextRisk => "text_risk",
        }
    }
}

/// Signals that fed a verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetySignals {
    pub heuristic_score: f32,
    pub text_risk_level: TextRiskLevel,
    pub detected_keywords: BTreeSet<String>,
}

/// Result of a safety evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub allowed: bool,
    /// Set whenever the request is blocked; also set on the fail-open path
    pub reason: Option<String>,
    pub confidence: f32,
    /// Rule that blocked the request
    pub rule: Option<BlockRule>,
    /// True when the heuristic scorer failed
    #[serde(default)]
    pub check_failed: bool,
    pub signals: SafetySignals,
}

impl SafetyVerdict {
    pub fn allow(confidence: f32, signals: SafetySignals) -> Self {
        Self {
            allowed: true,
            reason: None,
            confidence,
            rule: None,
            check_failed: false,
            signals,
        }
    }

    pub fn block(
        rule: BlockRule,
        reason: impl Into<String>,
        confidence: f32,
        signals: SafetySignals,
    ) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            confidence,
            rule: Some(rule),
            check_failed: false,
            signals,
        }
    }

    /// Allow verdict returned when the heuristic scorer could not produce a score
    pub fn fail_open() -> Self {
        Self {
            allowed: true,
            reason: Some(REASON_CHECK_FAILED.to_string()),
            confidence: 0.0,
            rule: None,
            check_failed: true,
            signals: SafetySignals::default(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        !self.allowed
    }
}

/// Policy configuration for the safety engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Heuristic score at or above which a request is blocked
    pub heuristic_block_threshold: f32,
    /// Object-type substrings that are always blocked (hard policy override)
    pub blocked_type_terms: Vec<String>,
    /// Keyword taxonomy used for text risk analysis
    pub keyword_groups: Vec<KeywordGroup>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            heuristic_block_threshold: 0.8,
            blocked_type_terms: [
                "tank", "military", "armored", "combat", "battle", "war", "defense",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            keyword_groups: default_keyword_groups(),
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.heuristic_block_threshold) {
            return Err(format!(
                "heuristic_block_threshold must be within [0, 1], got {}",
                self.heuristic_block_threshold
            ));
        }
        if self.blocked_type_terms.iter().any(|t| t.trim().is_empty()) {
            return Err("blocked_type_terms must not contain empty terms".to_string());
        }
        Ok(())
    }
}

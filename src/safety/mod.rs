// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Safety gate for counting requests: rule-ordered allow/block decisions over
//! the requested object type and a heuristic visual score

pub mod engine;
pub mod heuristic;
pub mod keywords;
pub mod statistics;
pub mod types;

pub use engine::SafetyEngine;
pub use heuristic::{HeuristicScorer, ImageCharacteristics, ImageHeuristicScorer, ScoringError};
pub use keywords::{KeywordCategory, KeywordGroup, TextAnalysis};
pub use statistics::{SafetyStatistics, SafetyStatisticsSnapshot};
pub use types::{BlockRule, SafetyConfig, SafetySignals, SafetyVerdict, TextRiskLevel};

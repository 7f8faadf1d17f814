// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keyword taxonomy for text risk analysis of requested object types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::safety::types::TextRiskLevel;

/// Taxonomy groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Vehicles,
    Aircraft,
    Ships,
    Weapons,
    Equipment,
}

/// Sensitive keyword entries: (category, keywords)
const KEYWORD_TAXONOMY: &[(KeywordCategory, &[&str])] = &[
    (
        KeywordCategory::Vehicles,
        &["tank", "armored", "military", "combat", "battle", "war", "defense"],
    ),
    (
        KeywordCategory::Aircraft,
        &["fighter", "bomber", "helicopter", "drone", "military aircraft"],
    ),
    (
        KeywordCategory::Ships,
        &["warship", "battleship", "destroyer", "submarine", "naval"],
    ),
    (
        KeywordCategory::Weapons,
        &["missile", "rocket", "artillery", "cannon", "weapon"],
    ),
    (
        KeywordCategory::Equipment,
        &["radar", "command", "control", "military base", "barracks"],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub category: KeywordCategory,
    pub keywords: Vec<String>,
}

pub fn default_keyword_groups() -> Vec<KeywordGroup> {
    KEYWORD_TAXONOMY
        .iter()
        .map(|(category, keywords)| KeywordGroup {
            category: *category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// Outcome of keyword analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub risk_level: TextRiskLevel,
    pub detected_keywords: BTreeSet<String>,
    pub matched_categories: Vec<KeywordCategory>,
}

/// Scan an object type against the taxonomy. Only the first matching keyword of
/// each group is recorded.
pub fn analyze_object_type(groups: &[KeywordGroup], object_type: &str) -> TextAnalysis {
    let lower = object_type.to_lowercase();
    let mut detected_keywords = BTreeSet::new();
    let mut matched_categories = Vec::new();

    for group in groups {
        if let Some(keyword) = group
            .keywords
            .iter()
            .find(|k| lower.contains(&k.to_lowercase()))
        {
            detected_keywords.insert(keyword.clone());
            matched_categories.push(group.category);
        }
    }

    let risk_level = if detected_keywords.is_empty() {
        TextRiskLevel::Low
    } else {
        TextRiskLevel::High
    };

    TextAnalysis {
        risk_level,
        detected_keywords,
        matched_categories,
    }
}

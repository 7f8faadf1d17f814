// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the object counter core
//!
//! Errors are contained at the component boundary:
//! - Validation errors are the caller's fault and are never retried
//! - Scoring failures are turned into a fail-open verdict by the safety engine
//! - Detector failures become an empty detection list in the counting path
//! - Registry I/O failures abort `learn` but not `delete`

use std::time::Duration;
use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by the counting, safety, learning and accuracy components
#[derive(Error, Debug)]
pub enum CounterError {
    /// Bad input shape (too few samples, empty name, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested object type is not part of the counting vocabulary
    #[error("Unsupported object type: {0}")]
    UnsupportedObjectType(String),

    /// Heuristic scorer or detector collaborator failed
    #[error("Scoring failed: {0}")]
    ScoringFailure(String),

    /// Backing store unavailable during a registry or correction mutation
    #[error("Registry I/O failure: {0}")]
    RegistryIo(#[from] StoreError),

    /// Trainer could not produce an artifact
    #[error("Training failed for '{name}': {reason}")]
    TrainingFailed { name: String, reason: String },

    /// Trainer did not finish within the configured timeout
    #[error("Training for '{name}' timed out after {timeout:?}")]
    TrainingTimedOut { name: String, timeout: Duration },

    /// Training was cancelled by the caller
    #[error("Training for '{0}' was cancelled")]
    TrainingCancelled(String),

    /// Learned-model counting requested for a category that is not registered
    #[error("Object type '{0}' not learned yet")]
    CategoryNotLearned(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CounterError {
    /// Whether the error was caused by caller input rather than the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CounterError::Validation(_) | CounterError::UnsupportedObjectType(_)
        )
    }
}

pub type CounterResult<T> = Result<T, CounterError>;

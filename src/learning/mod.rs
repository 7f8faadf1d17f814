// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Learned object categories: few-shot registration, lookup and removal

pub mod registry;
pub mod trainer;
pub mod types;

pub use registry::{LearnOptions, LearnedCategoryRegistry, REGISTRY_KEY};
pub use trainer::{BaseWeightsTrainer, Trainer, TrainerError};
pub use types::{
    validate_category_name, CategoryStatus, DeletionReport, LearnedCategory, LearningConfig,
};

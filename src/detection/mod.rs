// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection post-processing: category mapping and count aggregation

pub mod aggregator;
pub mod category_mapper;
pub mod detector;
pub mod types;

pub use aggregator::{AggregationConfig, CountAggregator};
pub use category_mapper::{
    is_animal_type, is_known_object_type, map_class_id, CocoCategoryMapper, LabelMapper,
    LearnedCategoryMapper, ANIMAL_TYPES, OBJECT_TYPES, OTHER_LABEL,
};
pub use detector::{Detector, DetectorError, StaticDetector};
pub use types::{BoundingBox, CountResult, Detection, RawDetection};

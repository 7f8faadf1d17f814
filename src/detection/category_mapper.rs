// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Translation from detector-native class ids to the counter's object vocabulary

use std::borrow::Cow;

/// Label for class ids that have no entry in the lookup table
pub const OTHER_LABEL: &str = "other";

/// Object types accepted by the counting endpoint
pub const OBJECT_TYPES: &[&str] = &[
    "car", "cat", "tree", "dog", "building", "person", "sky", "ground", "hardware", "tank",
];

/// Visually similar species that tolerate cross-category matches
pub const ANIMAL_TYPES: &[&str] = &[
    "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
];

/// COCO class id -> object type. Vehicles (car, motorcycle, bus, truck) collapse into "car".
const COCO_CATEGORY_MAP: &[(u32, &str)] = &[
    (0, "person"),
    (2, "car"),
    (3, "car"),
    (5, "car"),
    (7, "car"),
    (15, "cat"),
    (16, "dog"),
    (17, "horse"),
    (18, "sheep"),
    (19, "cow"),
    (20, "elephant"),
    (21, "bear"),
    (22, "zebra"),
    (23, "giraffe"),
    (24, "backpack"),
    (25, "umbrella"),
    (26, "handbag"),
    (27, "tie"),
    (28, "suitcase"),
    (29, "frisbee"),
    (30, "skis"),
    (31, "snowboard"),
    (32, "sports ball"),
    (33, "kite"),
    (34, "baseball bat"),
    (35, "baseball glove"),
    (36, "skateboard"),
    (37, "surfboard"),
    (38, "tennis racket"),
    (39, "bottle"),
    (40, "wine glass"),
    (41, "cup"),
    (42, "fork"),
    (43, "knife"),
    (44, "spoon"),
    (45, "bowl"),
    (46, "banana"),
    (47, "apple"),
    (48, "sandwich"),
    (49, "orange"),
    (50, "broccoli"),
    (51, "carrot"),
    (52, "hot dog"),
    (53, "pizza"),
    (54, "donut"),
    (55, "cake"),
    (56, "chair"),
    (57, "couch"),
    (58, "potted plant"),
    (59, "bed"),
    (60, "dining table"),
    (61, "toilet"),
    (62, "tv"),
    (63, "laptop"),
    (64, "mouse"),
    (65, "remote"),
    (66, "keyboard"),
    (67, "cell phone"),
    (68, "microwave"),
    (69, "oven"),
    (70, "toaster"),
    (71, "sink"),
    (72, "refrigerator"),
    (73, "book"),
    (74, "clock"),
    (75, "vase"),
    (76, "scissors"),
    (77, "teddy bear"),
    (78, "hair drier"),
    (79, "toothbrush"),
];

/// Map a COCO class id to an object type, `"other"` when unknown
pub fn map_class_id(class_id: u32) -> &'static str {
    COCO_CATEGORY_MAP
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, label)| *label)
        .unwrap_or(OTHER_LABEL)
}

/// Case-insensitive membership in the animal set
pub fn is_animal_type(object_type: &str) -> bool {
    let lower = object_type.to_lowercase();
    ANIMAL_TYPES.contains(&lower.as_str())
}

/// Whether a label belongs to the static vocabulary (request types or mapped labels)
pub fn is_known_object_type(object_type: &str) -> bool {
    let lower = object_type.to_lowercase();
    OBJECT_TYPES.contains(&lower.as_str())
        || COCO_CATEGORY_MAP.iter().any(|(_, label)| *label == lower)
}

/// Maps detector class ids to labels
pub trait LabelMapper: Send + Sync {
    fn map(&self, class_id: u32) -> Cow<'_, str>;
}

/// Static COCO lookup used with the base detector
#[derive(Debug, Clone, Copy, Default)]
pub struct CocoCategoryMapper;

impl LabelMapper for CocoCategoryMapper {
    fn map(&self, class_id: u32) -> Cow<'_, str> {
        Cow::Borrowed(map_class_id(class_id))
    }
}

/// Mapper for a learned artifact: class 0 is the learned category, everything
/// else falls back to the COCO table
#[derive(Debug, Clone)]
pub struct LearnedCategoryMapper {
    name: String,
}

impl LearnedCategoryMapper {
    pub const LEARNED_CLASS_ID: u32 = 0;

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LabelMapper for LearnedCategoryMapper {
    fn map(&self, class_id: u32) -> Cow<'_, str> {
        if class_id == Self::LEARNED_CLASS_ID {
            Cow::Borrowed(self.name.as_str())
        } else {
            Cow::Borrowed(map_class_id(class_id))
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for the image-characteristics heuristic scorer

use fabstir_object_counter::safety::{HeuristicScorer, ImageHeuristicScorer, ScoringError};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn png(width: u32, height: u32, value: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_small_bright_image_scores_zero() {
    let scorer = ImageHeuristicScorer::default();
    let score = scorer.score(&png(64, 64, 240), Some("cat.png")).await.unwrap();
    assert_eq!(score, 0.0);
}

#[tokio::test]
async fn test_sensitive_filename_on_dark_image() {
    let scorer = ImageHeuristicScorer::default();
    let score = scorer.score(&png(64, 64, 10), Some("tank.png")).await.unwrap();
    assert_eq!(score, 0.85);
}

#[tokio::test]
async fn test_large_dark_image_without_sensitive_name() {
    let scorer = ImageHeuristicScorer::default();
    let score = scorer.score(&png(1000, 600, 5), Some("night.png")).await.unwrap();
    assert_eq!(score, 0.8);
}

#[tokio::test]
async fn test_measured_characteristics() {
    let chars = ImageHeuristicScorer::measure(&png(200, 100, 255)).unwrap();
    assert_eq!(chars.width, 200);
    assert_eq!(chars.height, 100);
    assert_eq!(chars.aspect_ratio, 2.0);
    assert!(chars.brightness > 0.99);
}

#[tokio::test]
async fn test_undecodable_image_is_an_error() {
    let scorer = ImageHeuristicScorer::default();
    let result = scorer.score(b"definitely not a png", None).await;
    assert!(matches!(result, Err(ScoringError::DecodeFailed(_))));
}

#[test]
fn test_custom_filename_keywords() {
    let scorer = ImageHeuristicScorer::new(vec!["forklift".to_string()]);
    assert!(scorer.has_sensitive_filename(Some("FORKLIFT_01.jpg")));
    assert!(!scorer.has_sensitive_filename(Some("tank.jpg")));
    assert!(!scorer.has_sensitive_filename(None));
}

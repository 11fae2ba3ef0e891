// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end reader tests with deterministic stub collaborators
//!
//! No models are needed: recognizers and detectors are test doubles.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use water_meter_ocr::vision::encode_png;
use water_meter_ocr::vision::image_utils::encode_png_base64;
use water_meter_ocr::{
    BoundingBox, MeterDetector, MeterReader, ReaderConfig, RecognitionError, TextRecognizer,
    VariantKind,
};

/// Answers by image size; anything unknown fails
struct SizeKeyedRecognizer {
    answers: HashMap<(u32, u32), &'static str>,
    calls: AtomicUsize,
}

impl SizeKeyedRecognizer {
    fn new(answers: &[((u32, u32), &'static str)]) -> Self {
        Self {
            answers: answers.iter().cloned().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextRecognizer for SizeKeyedRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(&(image.width(), image.height()))
            .map(|s| s.to_string())
            .ok_or_else(|| RecognitionError::Unavailable("no answer for this size".to_string()))
    }

    fn name(&self) -> &'static str {
        "size-keyed"
    }
}

struct StaticDetector(Vec<BoundingBox>);

impl MeterDetector for StaticDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<BoundingBox>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn meter_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([40, 40, 40])))
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    // =============================================================================
    // Whole-image reading
    // =============================================================================

    /// Test 1: Bytes in, reading out
    #[tokio::test]
    async fn test_process_reading_from_png_bytes() {
        // Original and threshold views are 200x100; high contrast is 800x600
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[
            ((200, 100), "ITRON 2019\nDN15 PN16"),
            ((800, 600), "Reading: 012345 m3"),
        ]));
        let reader = MeterReader::new(recognizer.clone(), ReaderConfig::default());

        let bytes = encode_png(&meter_photo()).unwrap();
        let result = reader.process_reading(&bytes).await;

        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.reading, "012345");
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.winning_variant, Some(VariantKind::HighContrast));
        assert_eq!(result.raw_text.as_deref(), Some("Reading: 012345 m3"));
        assert_eq!(result.debug_info, vec!["", "012345", "", ""]);
        // Only the 60x60 center crop had no answer
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].contains("center_crop"));
    }

    /// Test 2: Base64 entry point behaves the same
    #[tokio::test]
    async fn test_process_base64() {
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[((60, 60), "□00731■")]));
        let reader = MeterReader::new(recognizer, ReaderConfig::default());

        let encoded = encode_png_base64(&meter_photo()).unwrap();
        let result = reader.process_base64(&encoded).await;
        assert_eq!(result.reading, "00731");
        assert_eq!(result.winning_variant, Some(VariantKind::CenterCrop));
    }

    /// Test 3: Oversized payloads are rejected before decoding
    #[tokio::test]
    async fn test_size_limit() {
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[]));
        let config = ReaderConfig {
            max_image_bytes: 16,
            ..ReaderConfig::default()
        };
        let reader = MeterReader::new(recognizer.clone(), config);

        let result = reader.process_reading(&encode_png(&meter_photo()).unwrap()).await;
        assert!(result.is_empty());
        assert!(result.diagnostics[0].contains("too large"));
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    }

    /// Test 4: All recognitions failing is an empty result, not an error
    #[tokio::test]
    async fn test_all_variants_fail() {
        let reader = MeterReader::new(
            Arc::new(SizeKeyedRecognizer::new(&[])),
            ReaderConfig::default(),
        );
        let result = reader.process_image(&meter_photo()).await;

        assert!(result.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.debug_info, vec!["", "", "", ""]);
        assert_eq!(result.diagnostics.len(), 5);
        assert_eq!(result.diagnostics[4], "No reading candidate found");
    }

    // =============================================================================
    // Detection path
    // =============================================================================

    /// Test 5: Crop follows the best box after NMS, padded and clamped
    #[tokio::test]
    async fn test_detection_crop_with_padding() {
        // Best box 100x40 at (50, 30); 10% padding gives 120x48 at (40, 26)
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[((120, 48), "0002541")]));
        let detector = StaticDetector(vec![
            BoundingBox::new(50, 30, 150, 70, 0.95),
            BoundingBox::new(52, 31, 151, 71, 0.60),
        ]);
        let reader = MeterReader::new(recognizer, ReaderConfig::default())
            .with_detector(Arc::new(detector));

        let result = reader.process_image(&meter_photo()).await;
        assert_eq!(result.reading, "0002541");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.detections.len(), 1);

        let annotated = image::load_from_memory(result.annotated_image.as_ref().unwrap()).unwrap();
        assert_eq!((annotated.width(), annotated.height()), (200, 100));
    }

    /// Test 6: Annotation can be switched off
    #[tokio::test]
    async fn test_annotation_disabled() {
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[]));
        let config = ReaderConfig {
            annotate_detections: false,
            ..ReaderConfig::default()
        };
        let reader = MeterReader::new(recognizer, config)
            .with_detector(Arc::new(StaticDetector(vec![BoundingBox::new(0, 0, 50, 50, 0.9)])));

        let result = reader.process_image(&meter_photo()).await;
        assert_eq!(result.detections.len(), 1);
        assert!(result.annotated_image.is_none());
    }

    /// Test 7: No boxes means the whole image is read
    #[tokio::test]
    async fn test_empty_detection_reads_whole_image() {
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[((200, 100), "4711")]));
        let reader = MeterReader::new(recognizer, ReaderConfig::default())
            .with_detector(Arc::new(StaticDetector(Vec::new())));

        let result = reader.process_image(&meter_photo()).await;
        assert_eq!(result.reading, "4711");
        assert!(result.detections.is_empty());
        assert!(result.annotated_image.is_none());
    }

    // =============================================================================
    // Concurrency
    // =============================================================================

    /// Test 8: One reader serves concurrent calls independently
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_share_reader() {
        let recognizer = Arc::new(SizeKeyedRecognizer::new(&[
            ((200, 100), "12345"),
            ((100, 200), "67890"),
        ]));
        let reader = Arc::new(MeterReader::new(recognizer.clone(), ReaderConfig::default()));

        let wide = meter_photo();
        let tall = DynamicImage::ImageRgb8(RgbImage::new(100, 200));
        let (a, b) = tokio::join!(reader.process_image(&wide), reader.process_image(&tall));

        assert_eq!(a.reading, "12345");
        assert_eq!(b.reading, "67890");
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 8);
    }
}

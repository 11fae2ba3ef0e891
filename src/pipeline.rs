// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Meter reading pipeline
//!
//! decode -> (detect -> NMS -> crop) -> 4 variants -> concurrent recognition
//! -> per-variant selection -> cross-variant selection -> result.
//!
//! No step is fatal. Every failure is recorded as a diagnostic and the call
//! still returns a [`WaterMeterResult`].

use futures::future::join_all;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::reading::{ReadingError, VariantReading, WaterMeterResult};
use crate::vision::annotate::annotate_detections;
use crate::vision::geometry::BoundingBox;
use crate::vision::image_utils::{decode_base64_image, decode_image_bytes_with_limit, encode_png};
use crate::vision::nms::non_max_suppression;
use crate::vision::ocr::{MeterDetector, RecognitionError, TextRecognizer};
use crate::vision::variants::{generate_variants, PreprocessingVariant};

/// Region handed to the variant generator, plus what detection found
struct MeterRegion {
    image: DynamicImage,
    detections: Vec<BoundingBox>,
    annotated: Option<Vec<u8>>,
}

/// Reads a meter value from images
///
/// Holds no per-request state; one reader can serve concurrent calls as long
/// as its collaborators can.
pub struct MeterReader {
    recognizer: Arc<dyn TextRecognizer>,
    detector: Option<Arc<dyn MeterDetector>>,
    config: ReaderConfig,
}

impl std::fmt::Debug for MeterReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeterReader")
            .field("recognizer", &self.recognizer.name())
            .field("detector", &self.detector.as_ref().map(|d| d.name()))
            .field("config", &self.config)
            .finish()
    }
}

impl MeterReader {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: ReaderConfig) -> Self {
        Self {
            recognizer,
            detector: None,
            config,
        }
    }

    /// Locate the meter window before reading
    pub fn with_detector(mut self, detector: Arc<dyn MeterDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read a meter value from encoded image bytes
    pub async fn process_reading(&self, image_bytes: &[u8]) -> WaterMeterResult {
        match decode_image_bytes_with_limit(image_bytes, self.config.max_image_bytes) {
            Ok((image, info)) => {
                info!(
                    "Decoded {:?} image {}x{} ({} bytes)",
                    info.format, info.width, info.height, info.size_bytes
                );
                self.process_image(&image).await
            }
            Err(e) => {
                let err = ReadingError::Decode(e);
                warn!("{}", err);
                WaterMeterResult::failed(err.to_string())
            }
        }
    }

    /// Read a meter value from a base64-encoded image
    pub async fn process_base64(&self, image_base64: &str) -> WaterMeterResult {
        match decode_base64_image(image_base64, self.config.max_image_bytes) {
            Ok((image, _)) => self.process_image(&image).await,
            Err(e) => {
                let err = ReadingError::Decode(e);
                warn!("{}", err);
                WaterMeterResult::failed(err.to_string())
            }
        }
    }

    /// Read a meter value from a decoded image
    pub async fn process_image(&self, image: &DynamicImage) -> WaterMeterResult {
        let mut diagnostics = Vec::new();

        let region = self.locate_meter(image, &mut diagnostics).await;
        let variants = generate_variants(&region.image);
        let readings = self.recognize_variants(&variants, &mut diagnostics).await;

        let source_image = if self.config.include_source_image {
            match encode_png(image) {
                Ok(png) => Some(png),
                Err(e) => {
                    diagnostics.push(format!("Source image encoding failed: {}", e));
                    None
                }
            }
        } else {
            None
        };

        WaterMeterResult::assemble(&readings, diagnostics)
            .with_detections(region.detections)
            .with_annotated_image(region.annotated)
            .with_source_image(source_image)
    }

    /// Detect, suppress overlaps and crop the best box; the whole image otherwise
    async fn locate_meter(&self, image: &DynamicImage, diagnostics: &mut Vec<String>) -> MeterRegion {
        let whole = |detections| MeterRegion {
            image: image.clone(),
            detections,
            annotated: None,
        };

        let Some(detector) = &self.detector else {
            return whole(Vec::new());
        };

        // Detection is blocking inference; keep it off the async workers
        let detection = {
            let detector = Arc::clone(detector);
            let input = image.clone();
            tokio::task::spawn_blocking(move || detector.detect(&input))
                .await
                .map_err(|e| anyhow::anyhow!("Detection task failed: {}", e))
                .and_then(|result| result)
        };

        let raw = match detection {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Meter detection failed, reading whole image: {:#}", e);
                diagnostics.push(format!("Detection failed: {:#}", e));
                return whole(Vec::new());
            }
        };

        let kept = non_max_suppression(&raw, self.config.iou_threshold);
        debug!("Detector returned {} boxes, {} after NMS", raw.len(), kept.len());

        let Some(best) = kept.first() else {
            info!("No meter window detected, reading whole image");
            return whole(kept);
        };

        let (width, height) = (image.width(), image.height());
        let crop = best.expand(self.config.crop_padding, width, height);
        let cropped = if crop.width() == 0 || crop.height() == 0 {
            image.clone()
        } else {
            image.crop_imm(crop.x1, crop.y1, crop.width(), crop.height())
        };

        let annotated = if self.config.annotate_detections {
            match encode_png(&annotate_detections(image, &kept)) {
                Ok(png) => Some(png),
                Err(e) => {
                    diagnostics.push(format!("Annotated image encoding failed: {}", e));
                    None
                }
            }
        } else {
            None
        };

        MeterRegion {
            image: cropped,
            detections: kept,
            annotated,
        }
    }

    /// Recognize all variants concurrently, each under its own timeout
    async fn recognize_variants(
        &self,
        variants: &[PreprocessingVariant],
        diagnostics: &mut Vec<String>,
    ) -> Vec<VariantReading> {
        let limit = Duration::from_millis(self.config.recognition_timeout_ms);

        let futures = variants.iter().map(|variant| async move {
            match timeout(limit, self.recognizer.recognize(&variant.image)).await {
                Ok(result) => result,
                Err(_) => Err(RecognitionError::Timeout),
            }
        });
        let results = join_all(futures).await;

        variants
            .iter()
            .zip(results)
            .map(|(variant, result)| match result {
                Ok(text) => {
                    let reading = VariantReading::from_text(variant.kind, &text);
                    debug!("Variant {} read {:?}", variant.kind, reading.reading);
                    reading
                }
                Err(source) => {
                    let err = ReadingError::Recognition {
                        variant: variant.kind,
                        source,
                    };
                    warn!("{}", err);
                    diagnostics.push(err.to_string());
                    VariantReading::failed(variant.kind)
                }
            })
            .collect()
    }
}

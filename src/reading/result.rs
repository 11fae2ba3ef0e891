// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-variant readings and the final result record

use serde::{Deserialize, Serialize};
use tracing::info;

use super::confidence::estimate_confidence;
use super::extractor::extract_candidates;
use super::normalizer::normalize;
use super::scorer::{select_best_variant, select_candidate};
use super::ReadingError;
use crate::vision::geometry::BoundingBox;
use crate::vision::variants::VariantKind;

/// What one preprocessing variant produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantReading {
    pub kind: VariantKind,
    /// Recognized text; `None` when recognition failed
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub processed_text: Option<String>,
    /// Selected digit run, empty when none survived
    pub reading: String,
}

impl VariantReading {
    /// Normalize, extract and select the reading of one recognized text
    pub fn from_text(kind: VariantKind, raw_text: &str) -> Self {
        let processed = normalize(raw_text);
        let candidates = extract_candidates(&processed);
        let reading = select_candidate(&candidates, raw_text, &processed)
            .map(|c| c.digits.clone())
            .unwrap_or_default();

        Self {
            kind,
            raw_text: Some(raw_text.to_string()),
            processed_text: Some(processed),
            reading,
        }
    }

    /// A variant whose recognition failed
    pub fn failed(kind: VariantKind) -> Self {
        Self {
            kind,
            raw_text: None,
            processed_text: None,
            reading: String::new(),
        }
    }
}

/// Final output of one reading call
///
/// `confidence` is a coarse bucket (see [`estimate_confidence`]), not a
/// calibrated probability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterMeterResult {
    /// Winning digit string, empty when nothing was read
    pub reading: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_variant: Option<VariantKind>,
    /// Per-variant extracted strings, in generation order
    #[serde(default)]
    pub debug_info: Vec<String>,
    /// Failure messages in the order they occurred
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Every variant's recognized and normalized text, winner or not
    #[serde(default)]
    pub variants: Vec<VariantReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    /// Boxes kept after non-maximum suppression
    #[serde(default)]
    pub detections: Vec<BoundingBox>,
    /// PNG of the source with detections drawn
    #[serde(skip)]
    pub annotated_image: Option<Vec<u8>>,
    /// PNG of the decoded source
    #[serde(skip)]
    pub source_image: Option<Vec<u8>>,
}

impl WaterMeterResult {
    /// Empty result for an input that never reached recognition
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostics: vec![diagnostic.into()],
            ..Self::default()
        }
    }

    /// Combine per-variant readings into the final record
    ///
    /// `diagnostics` carries earlier failure messages; a missing winner adds
    /// a no-candidate message.
    pub fn assemble(variants: &[VariantReading], mut diagnostics: Vec<String>) -> Self {
        let debug_info: Vec<String> = variants.iter().map(|v| v.reading.clone()).collect();

        let Some(index) = select_best_variant(&debug_info) else {
            diagnostics.push(ReadingError::NoCandidateFound.to_string());
            info!("No reading found across {} variants", variants.len());
            return Self {
                debug_info,
                diagnostics,
                variants: variants.to_vec(),
                ..Self::default()
            };
        };

        let winner = &variants[index];
        let confidence = estimate_confidence(&winner.reading);
        info!(
            "Reading {} from {} variant (confidence {:.1})",
            winner.reading, winner.kind, confidence
        );

        Self {
            reading: winner.reading.clone(),
            confidence,
            winning_variant: Some(winner.kind),
            debug_info,
            diagnostics,
            variants: variants.to_vec(),
            raw_text: winner.raw_text.clone(),
            processed_text: winner.processed_text.clone(),
            ..Self::default()
        }
    }

    pub fn with_detections(mut self, detections: Vec<BoundingBox>) -> Self {
        self.detections = detections;
        self
    }

    pub fn with_annotated_image(mut self, png: Option<Vec<u8>>) -> Self {
        self.annotated_image = png;
        self
    }

    pub fn with_source_image(mut self, png: Option<Vec<u8>>) -> Self {
        self.source_image = png;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.reading.is_empty()
    }
}

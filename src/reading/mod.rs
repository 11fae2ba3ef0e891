// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turning noisy recognized text into one meter reading
//!
//! Components:
//! - `normalizer` - look-alike letter to digit correction
//! - `extractor` - digit runs from the lines worth reading
//! - `scorer` - within-text and cross-variant selection
//! - `confidence` - bucketed confidence of the winner
//! - `result` - per-variant readings and the final record

pub mod confidence;
pub mod extractor;
pub mod normalizer;
pub mod result;
pub mod scorer;

use thiserror::Error;

use crate::vision::image_utils::ImageError;
use crate::vision::ocr::recognition::RecognitionError;
use crate::vision::variants::VariantKind;

pub use confidence::estimate_confidence;
pub use extractor::{extract_candidates, Candidate};
pub use normalizer::normalize;
pub use result::{VariantReading, WaterMeterResult};
pub use scorer::{coarse_score, fine_score, select_best_variant, select_candidate};

/// Failure categories of a reading call
///
/// None of these abort a call; they are rendered into
/// [`WaterMeterResult::diagnostics`].
#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("Image decode failed: {0}")]
    Decode(#[from] ImageError),

    #[error("Recognition failed for {variant} variant: {source}")]
    Recognition {
        variant: VariantKind,
        #[source]
        source: RecognitionError,
    },

    #[error("No reading candidate found")]
    NoCandidateFound,
}

/// Reading of a single recognized text, empty when none is found
pub fn extract_reading(raw_text: &str) -> String {
    VariantReading::from_text(VariantKind::Original, raw_text).reading
}

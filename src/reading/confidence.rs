// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Confidence buckets for a final reading
//!
//! A coarse heuristic on the shape of the winning string, not a calibrated
//! probability.

pub const CONFIDENCE_NONE: f32 = 0.0;
pub const CONFIDENCE_LEADING_ZEROS: f32 = 0.9;
pub const CONFIDENCE_TYPICAL_LENGTH: f32 = 0.7;
pub const CONFIDENCE_LOW: f32 = 0.3;

/// Bucketed confidence for `reading`
pub fn estimate_confidence(reading: &str) -> f32 {
    if reading.is_empty() {
        CONFIDENCE_NONE
    } else if reading.starts_with("000") {
        CONFIDENCE_LEADING_ZEROS
    } else if (5..=7).contains(&reading.chars().count()) {
        CONFIDENCE_TYPICAL_LENGTH
    } else {
        CONFIDENCE_LOW
    }
}

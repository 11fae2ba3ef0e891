// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Within-text and cross-variant selection tests

use water_meter_ocr::reading::extractor::Candidate;
use water_meter_ocr::reading::scorer::{select_by_score, ScoringContext};
use water_meter_ocr::reading::{
    coarse_score, estimate_confidence, fine_score, select_best_variant, VariantReading,
    WaterMeterResult,
};
use water_meter_ocr::VariantKind;

fn candidate(digits: &str, offset: usize) -> Candidate {
    Candidate {
        digits: digits.to_string(),
        line_index: 0,
        offset,
    }
}

#[cfg(test)]
mod selection_tests {
    use super::*;

    // =============================================================================
    // Cross-variant selection
    // =============================================================================

    /// Test 1: Five digits beat four regardless of scores
    #[test]
    fn test_exact_length_short_circuit() {
        assert_eq!(select_best_variant(&["1234", "99999", "", "456"]), Some(1));
    }

    /// Test 2: Coarse ties go to the earlier variant
    #[test]
    fn test_coarse_tie_breaks_by_generation_order() {
        assert_eq!(coarse_score("123456"), coarse_score("654321"));
        assert_eq!(select_best_variant(&["", "123456", "654321", ""]), Some(1));
    }

    /// Test 3: Year-looking readings lose the coarse bonus
    #[test]
    fn test_coarse_year_guard() {
        assert!(coarse_score("202401") < coarse_score("102401"));
        assert!(coarse_score("112024") < coarse_score("112025"));
    }

    // =============================================================================
    // Within-text scoring
    // =============================================================================

    /// Test 4: A year ranks below a plausible sibling
    #[test]
    fn test_year_suppression() {
        let raw = "2024 0815";
        let ctx = ScoringContext::new(raw, raw);
        let year = candidate("2024", 0);
        let reading = candidate("0815", 5);

        assert!(fine_score(&year, &ctx) < fine_score(&reading, &ctx));
        let candidates = vec![year, reading];
        assert_eq!(select_by_score(&candidates, &ctx).unwrap().digits, "0815");
    }

    /// Test 5: Model-number context is penalized
    #[test]
    fn test_model_number_penalty() {
        let raw = "MNK-123456 m3\n 654321 m3";
        let ctx = ScoringContext::new(raw, raw);
        let serial = candidate("123456", 4);
        let counter = candidate("654321", 15);
        assert!(fine_score(&serial, &ctx) < fine_score(&counter, &ctx));
    }

    // =============================================================================
    // Assembly
    // =============================================================================

    /// Test 6: Confidence buckets
    #[test]
    fn test_confidence_buckets() {
        assert_eq!(estimate_confidence("0002541"), 0.9);
        assert_eq!(estimate_confidence("12345"), 0.7);
        assert_eq!(estimate_confidence("12"), 0.3);
        assert_eq!(estimate_confidence(""), 0.0);
    }

    /// Test 7: The winner's texts travel with the result
    #[test]
    fn test_assembled_result_carries_winner_texts() {
        let variants = vec![
            VariantReading::from_text(VariantKind::Original, "Zenner\n8I2 m3"),
            VariantReading::failed(VariantKind::HighContrast),
            VariantReading::from_text(VariantKind::Threshold, "00B12 m3"),
            VariantReading::from_text(VariantKind::CenterCrop, ""),
        ];
        let result = WaterMeterResult::assemble(&variants, Vec::new());

        assert_eq!(result.reading, "00812");
        assert_eq!(result.winning_variant, Some(VariantKind::Threshold));
        assert_eq!(result.raw_text.as_deref(), Some("00B12 m3"));
        assert_eq!(result.processed_text.as_deref(), Some("00812 m3"));
        assert_eq!(result.debug_info, vec!["812", "", "00812", ""]);
        assert_eq!(result.confidence, 0.7);
    }
}

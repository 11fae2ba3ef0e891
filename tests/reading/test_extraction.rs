// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Normalization and candidate extraction tests

use water_meter_ocr::reading::extractor::{contains_unit_marker, is_candidate_line};
use water_meter_ocr::reading::{extract_candidates, extract_reading, normalize};

#[cfg(test)]
mod extraction_tests {
    use super::*;

    /// Test 1: Unit line survives and yields the digit run
    #[test]
    fn test_reading_with_unit() {
        let normalized = normalize("Reading: 012345 m3");
        assert_eq!(normalized, "Reading: 012345 m3");

        let candidates = extract_candidates(&normalized);
        assert_eq!(candidates[0].digits, "012345");
    }

    /// Test 2: Look-alike letters become digits
    #[test]
    fn test_confusion_correction() {
        assert_eq!(normalize("O12I5"), "01215");
        assert_eq!(extract_reading("O12I5"), "01215");
    }

    /// Test 3: Label lines are ignored, unit lines are not
    #[test]
    fn test_line_filter() {
        assert!(is_candidate_line("  00123  "));
        assert!(is_candidate_line("00123 M³"));
        assert!(!is_candidate_line("Typ 4711"));
        assert!(contains_unit_marker("Qn 2,5 m3/h"));
    }

    /// Test 4: Nothing to read
    #[test]
    fn test_no_candidates() {
        assert!(extract_candidates("").is_empty());
        assert_eq!(extract_reading("Kamstrup multical"), "");
    }

    /// Test 5: Multi-line text picks the counter line
    #[test]
    fn test_multiline_meter_face() {
        let raw = "SENSUS 620\nTyp 2021\n00254 m3\nQ3 2,5";
        assert_eq!(extract_reading(raw), "00254");
    }

    /// Test 6: Without exact lengths the context scorer decides
    #[test]
    fn test_scored_fallback() {
        // 7 digits on their own line beat a 3-digit run beside the unit
        let raw = "0012345\n123 m3";
        assert_eq!(extract_reading(raw), "0012345");
    }
}

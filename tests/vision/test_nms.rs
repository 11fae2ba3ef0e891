// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Non-maximum suppression tests
//!
//! Verifies NMS through the public API:
//! - IoU arithmetic on the documented example
//! - Idempotence on its own output
//! - Strict threshold comparison

use water_meter_ocr::vision::nms::{non_max_suppression, DEFAULT_IOU_THRESHOLD};
use water_meter_ocr::vision::{iou, BoundingBox};

fn cluster() -> Vec<BoundingBox> {
    vec![
        BoundingBox::new(10, 10, 110, 60, 0.72),
        BoundingBox::new(12, 8, 112, 58, 0.91),
        BoundingBox::new(300, 40, 380, 90, 0.55),
        BoundingBox::new(8, 12, 108, 62, 0.64),
        BoundingBox::new(305, 42, 385, 92, 0.81),
        BoundingBox::new(500, 500, 520, 510, 0.30),
    ]
}

#[cfg(test)]
mod nms_tests {
    use super::*;

    // =============================================================================
    // IoU
    // =============================================================================

    /// Test 1: Documented partial-overlap value
    #[test]
    fn test_iou_reference_value() {
        let a = BoundingBox::new(0, 0, 10, 10, 0.9);
        let b = BoundingBox::new(5, 5, 15, 15, 0.9);
        assert!((iou(&a, &b) - 0.1429).abs() < 1e-3);
        assert!((iou(&b, &a) - iou(&a, &b)).abs() < 1e-9);
    }

    /// Test 2: Disjoint boxes do not overlap
    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0, 0, 10, 10, 0.9);
        let b = BoundingBox::new(11, 11, 20, 20, 0.9);
        assert_eq!(iou(&a, &b), 0.0);
    }

    // =============================================================================
    // Suppression
    // =============================================================================

    /// Test 3: One box survives per cluster, strongest first
    #[test]
    fn test_one_box_per_cluster() {
        let kept = non_max_suppression(&cluster(), DEFAULT_IOU_THRESHOLD);
        let confidences: Vec<f32> = kept.iter().map(|b| b.confidence).collect();
        assert_eq!(confidences, vec![0.91, 0.81, 0.30]);
    }

    /// Test 4: Running NMS on its own output changes nothing
    #[test]
    fn test_idempotent() {
        let once = non_max_suppression(&cluster(), DEFAULT_IOU_THRESHOLD);
        let twice = non_max_suppression(&once, DEFAULT_IOU_THRESHOLD);
        assert_eq!(once, twice);
    }

    /// Test 5: IoU equal to the threshold is kept, above it is suppressed
    #[test]
    fn test_threshold_is_strict() {
        // Intersection 50, union 100: IoU is exactly 0.5
        let a = BoundingBox::new(0, 0, 10, 10, 0.9);
        let b = BoundingBox::new(0, 0, 10, 5, 0.8);
        assert_eq!(iou(&a, &b), 0.5);

        assert_eq!(non_max_suppression(&[a.clone(), b.clone()], 0.5).len(), 2);
        assert_eq!(non_max_suppression(&[a, b], 0.4999).len(), 1);
    }

    /// Test 6: Output never grows and is sorted by confidence
    #[test]
    fn test_output_ordered_subset() {
        let input = cluster();
        let kept = non_max_suppression(&input, 0.1);
        assert!(kept.len() <= input.len());
        assert!(kept.iter().all(|k| input.contains(k)));
        assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}

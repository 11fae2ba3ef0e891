// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Non-maximum suppression over detector boxes

use tracing::debug;

use super::geometry::{iou, BoundingBox};

/// Default IoU threshold above which a lower-confidence box is suppressed
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Reduce overlapping detections to a minimal set
///
/// Boxes are ordered by confidence (descending, stable for ties). Each box
/// still active when reached is kept, and every later active box whose IoU
/// with it is strictly greater than `iou_threshold` is dropped.
///
/// Output is in selection order, highest confidence first.
pub fn non_max_suppression(boxes: &[BoundingBox], iou_threshold: f32) -> Vec<BoundingBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    // NaN ranks below every real confidence
    let rank = |i: usize| {
        let c = boxes[i].confidence;
        if c.is_nan() {
            f32::NEG_INFINITY
        } else {
            c
        }
    };

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    // sort_by is stable, so equal confidences keep input order
    order.sort_by(|&a, &b| rank(b).total_cmp(&rank(a)));

    let mut active = vec![true; order.len()];
    let mut selected = Vec::new();

    for pos in 0..order.len() {
        if !active[pos] {
            continue;
        }
        let current = &boxes[order[pos]];
        selected.push(current.clone());

        for later in (pos + 1)..order.len() {
            if active[later] && iou(current, &boxes[order[later]]) > iou_threshold {
                active[later] = false;
            }
        }
    }

    debug!(
        "NMS kept {} of {} boxes (iou > {:.2} suppressed)",
        selected.len(),
        boxes.len(),
        iou_threshold
    );

    selected
}

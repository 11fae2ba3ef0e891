// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Box geometry for meter-window detections
//!
//! Pure integer-corner math: area, intersection-over-union and containment.

use serde::{Deserialize, Serialize};

/// Axis-aligned detection box with integer corners
///
/// Invariant: `x1 <= x2` and `y1 <= y2`. Constructors reorder swapped corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    /// Detector confidence (0.0-1.0)
    pub confidence: f32,
    /// Optional class label from the detector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BoundingBox {
    /// Create a box from two corners, reordering them if needed
    ///
    /// Confidence is clamped to `[0, 1]`; NaN becomes 0.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32, confidence: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
            label: None,
        }
    }

    /// Build a box from floating-point corners clamped to `width` x `height`
    pub fn from_corners_clamped(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let clamp_x = |v: f32| v.round().clamp(0.0, width as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, height as f32) as u32;
        Self::new(clamp_x(x1), clamp_y(y1), clamp_x(x2), clamp_y(y2), confidence)
    }

    /// Attach a class label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Clamp corners to image bounds
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.min(width),
            y1: self.y1.min(height),
            x2: self.x2.min(width),
            y2: self.y2.min(height),
            confidence: self.confidence,
            label: self.label.clone(),
        }
    }

    /// Grow the box by `fraction` of its size on every side, clamped to the image
    pub fn expand(&self, fraction: f32, width: u32, height: u32) -> Self {
        let pad_x = self.width() as f32 * fraction;
        let pad_y = self.height() as f32 * fraction;
        let mut expanded = Self::from_corners_clamped(
            self.x1 as f32 - pad_x,
            self.y1 as f32 - pad_y,
            self.x2 as f32 + pad_x,
            self.y2 as f32 + pad_y,
            self.confidence,
            width,
            height,
        );
        expanded.label = self.label.clone();
        expanded
    }

    /// Whether `other` lies entirely inside this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }
}

/// Intersection-over-union of two boxes, in `[0, 1]`
///
/// Non-overlapping boxes (and boxes that only touch) give 0. Two degenerate
/// boxes also give 0 instead of dividing by zero.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix1 = a.x1.max(b.x1) as i64;
    let iy1 = a.y1.max(b.y1) as i64;
    let ix2 = a.x2.min(b.x2) as i64;
    let iy2 = a.y2.min(b.y2) as i64;

    let iw = ix2 - ix1;
    let ih = iy2 - iy1;
    if iw <= 0 || ih <= 0 {
        return 0.0;
    }

    let intersection = (iw * ih) as f64;
    let union = a.area() as f64 + b.area() as f64 - intersection;
    if union <= 0.0 {
        return 0.0;
    }

    (intersection / union) as f32
}

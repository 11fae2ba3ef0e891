// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Preprocessing variants handed to the text recognizer
//!
//! Each variant is derived fresh from the source image (never chained), so the
//! four views can be recognized independently and in any order. The table
//! order is the deterministic tie-break order used by the selector.

use image::{imageops::FilterType, DynamicImage, GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Working resolution for the high-contrast view
pub const WORKING_WIDTH: u32 = 800;
pub const WORKING_HEIGHT: u32 = 600;

/// Contrast factor (2.0 = 200%) for the high-contrast view
pub const HIGH_CONTRAST_FACTOR: f32 = 2.0;

/// Brightness multiplier for the high-contrast view
pub const HIGH_CONTRAST_BRIGHTNESS: f32 = 1.3;

/// Binarization cut-off on 0.299R + 0.587G + 0.114B luminance
pub const THRESHOLD_LUMINANCE: f32 = 128.0;

/// Side of the center crop as a fraction of the shorter dimension
pub const CENTER_CROP_RATIO: f32 = 0.6;

/// Contrast factor applied to the center crop
pub const CENTER_CROP_CONTRAST: f32 = 1.8;

/// Identifier of a preprocessing transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Original,
    HighContrast,
    Threshold,
    CenterCrop,
}

impl VariantKind {
    /// Generation order
    pub const ALL: [VariantKind; 4] = [
        VariantKind::Original,
        VariantKind::HighContrast,
        VariantKind::Threshold,
        VariantKind::CenterCrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Original => "original",
            VariantKind::HighContrast => "high_contrast",
            VariantKind::Threshold => "threshold",
            VariantKind::CenterCrop => "center_crop",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transformed view of the source image
#[derive(Debug, Clone)]
pub struct PreprocessingVariant {
    pub kind: VariantKind,
    pub image: DynamicImage,
}

type Transform = fn(&DynamicImage) -> DynamicImage;

/// One row of the variant table
pub struct VariantSpec {
    pub kind: VariantKind,
    pub transform: Transform,
}

/// Variant table, in generation order
pub const VARIANT_TABLE: [VariantSpec; 4] = [
    VariantSpec {
        kind: VariantKind::Original,
        transform: original,
    },
    VariantSpec {
        kind: VariantKind::HighContrast,
        transform: high_contrast,
    },
    VariantSpec {
        kind: VariantKind::Threshold,
        transform: threshold,
    },
    VariantSpec {
        kind: VariantKind::CenterCrop,
        transform: center_crop,
    },
];

/// Produce the four variants of `source`, in table order
pub fn generate_variants(source: &DynamicImage) -> Vec<PreprocessingVariant> {
    VARIANT_TABLE
        .iter()
        .map(|spec| PreprocessingVariant {
            kind: spec.kind,
            image: (spec.transform)(source),
        })
        .collect()
}

fn original(source: &DynamicImage) -> DynamicImage {
    source.clone()
}

fn high_contrast(source: &DynamicImage) -> DynamicImage {
    if source.width() == 0 || source.height() == 0 {
        return source.clone();
    }
    let resized = source.resize_exact(WORKING_WIDTH, WORKING_HEIGHT, FilterType::Triangle);
    let mut rgba = resized.to_rgba8();
    adjust_contrast_brightness(&mut rgba, HIGH_CONTRAST_FACTOR, HIGH_CONTRAST_BRIGHTNESS);
    DynamicImage::ImageRgba8(rgba)
}

fn threshold(source: &DynamicImage) -> DynamicImage {
    let rgb = source.to_rgb8();
    let binary = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let luminance = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        if luminance > THRESHOLD_LUMINANCE {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    DynamicImage::ImageLuma8(binary)
}

fn center_crop(source: &DynamicImage) -> DynamicImage {
    let (width, height) = (source.width(), source.height());
    if width == 0 || height == 0 {
        return source.clone();
    }

    let shorter = width.min(height);
    let side = ((shorter as f32 * CENTER_CROP_RATIO).round() as u32).clamp(1, shorter);
    let x = (width - side) / 2;
    let y = (height - side) / 2;

    let mut rgba = source.crop_imm(x, y, side, side).to_rgba8();
    adjust_contrast_brightness(&mut rgba, CENTER_CROP_CONTRAST, 1.0);
    DynamicImage::ImageRgba8(rgba)
}

/// Contrast around the 128 midpoint, then a brightness multiplier; alpha untouched
fn adjust_contrast_brightness(image: &mut RgbaImage, contrast: f32, brightness: f32) {
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            let val = pixel[c] as f32;
            let adjusted = ((val - 128.0) * contrast + 128.0) * brightness;
            pixel[c] = adjusted.clamp(0.0, 255.0) as u8;
        }
    }
}

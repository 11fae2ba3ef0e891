// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Preprocessing variant tests

use image::{DynamicImage, Rgb, RgbImage};
use water_meter_ocr::vision::variants::{generate_variants, VariantKind, CENTER_CROP_RATIO};

/// Horizontal gradient so every transform has something to change
fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / width.max(1)) as u8;
        Rgb([v, v, v])
    }))
}

#[cfg(test)]
mod variant_tests {
    use super::*;

    /// Test 1: Generation is deterministic
    #[test]
    fn test_deterministic() {
        let source = gradient(120, 80);
        let first = generate_variants(&source);
        let second = generate_variants(&source);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.image.as_bytes(), b.image.as_bytes());
        }
    }

    /// Test 2: Original is untouched and the source is not modified
    #[test]
    fn test_original_matches_source() {
        let source = gradient(64, 32);
        let before = source.as_bytes().to_vec();
        let variants = generate_variants(&source);

        assert_eq!(variants[0].kind, VariantKind::Original);
        assert_eq!(variants[0].image.as_bytes(), before.as_slice());
        assert_eq!(source.as_bytes(), before.as_slice());
    }

    /// Test 3: Threshold output is strictly black and white
    #[test]
    fn test_threshold_is_binary() {
        let variants = generate_variants(&gradient(256, 4));
        let binary = variants[2].image.to_luma8();
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(binary.get_pixel(0, 0)[0], 0);
        assert_eq!(binary.get_pixel(255, 0)[0], 255);
    }

    /// Test 4: Center crop is a centered square of the shorter side
    #[test]
    fn test_center_crop_geometry() {
        let variants = generate_variants(&gradient(300, 100));
        let crop = &variants[3].image;
        let side = (100.0 * CENTER_CROP_RATIO).round() as u32;
        assert_eq!((crop.width(), crop.height()), (side, side));
    }
}

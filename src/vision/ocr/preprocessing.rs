// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the ONNX detector and recognizer

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input side of the meter-window detector
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Recognizer input height (PP-OCR rec models use 48)
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum recognizer input width
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum recognizer input width
pub const REC_MIN_WIDTH: u32 = 4;

/// Gray used to pad letterboxed detector input
const PAD_GRAY: u8 = 114;

/// The detector takes plain `[0, 1]` channels, no mean/std shift
const DET_MEAN: [f32; 3] = [0.0, 0.0, 0.0];
const DET_STD: [f32; 3] = [1.0, 1.0, 1.0];

/// Symmetric [-1, 1] normalization for the recognizer
const REC_MEAN: [f32; 3] = [0.5, 0.5, 0.5];
const REC_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// How a source image was fitted into the square detector input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale applied to the source
    pub scale: f32,
    /// Horizontal padding on the left
    pub pad_x: u32,
    /// Vertical padding on the top
    pub pad_y: u32,
    /// Size of the scaled source inside the square
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Compute the fit of `width` x `height` into a `target` square
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0,
                pad_y: 0,
                scaled_width: 0,
                scaled_height: 0,
                source_width: width,
                source_height: height,
            };
        }

        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target);

        Self {
            scale,
            pad_x: (target - new_w) / 2,
            pad_y: (target - new_h) / 2,
            scaled_width: new_w,
            scaled_height: new_h,
            source_width: width,
            source_height: height,
        }
    }

    /// Map a point from detector-input space back to source pixels
    pub fn map_to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Letterbox `image` into a `target` square, padded with gray
pub fn letterbox(image: &DynamicImage, target: u32) -> (RgbImage, Letterbox) {
    let (width, height) = image.dimensions();
    let fit = Letterbox::fit(width, height, target);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_GRAY, PAD_GRAY, PAD_GRAY]));

    if width == 0 || height == 0 {
        return (canvas, fit);
    }

    let resized = image
        .resize_exact(fit.scaled_width, fit.scaled_height, FilterType::Triangle)
        .to_rgb8();
    image::imageops::replace(&mut canvas, &resized, fit.pad_x as i64, fit.pad_y as i64);

    (canvas, fit)
}

/// Build the `[1, 3, 640, 640]` detector tensor and the letterbox used
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let (canvas, fit) = letterbox(image, DETECTION_INPUT_SIZE);
    (to_nchw(&canvas, DET_MEAN, DET_STD), fit)
}

/// Build the `[1, 3, 48, W]` recognizer tensor, W in `[4, 320]` from the aspect ratio
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let scale = REC_INPUT_HEIGHT as f32 / height.max(1) as f32;
    let new_width = ((width as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = image
        .resize_exact(new_width, REC_INPUT_HEIGHT, FilterType::Triangle)
        .to_rgb8();
    to_nchw(&resized, REC_MEAN, REC_STD)
}

fn to_nchw(rgb: &RgbImage, mean: [f32; 3], std: [f32; 3]) -> Array4<f32> {
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let mut tensor = Array4::zeros((1, 3, h, w));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }
    tensor
}

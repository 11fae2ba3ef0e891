// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image side of the meter reader
//!
//! This module provides:
//! - Decoding and encoding of image payloads
//! - Detection boxes, IoU and non-maximum suppression
//! - The four preprocessing variants fed to recognition
//! - ONNX detector/recognizer and a VLM recognizer behind shared traits
//!
//! Everything here runs on CPU.

pub mod annotate;
pub mod geometry;
pub mod image_utils;
pub mod model_manager;
pub mod nms;
pub mod ocr;
pub mod variants;
pub mod vlm_client;

pub use annotate::annotate_detections;
pub use geometry::{iou, BoundingBox};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, decode_image_bytes_with_limit, detect_format,
    encode_png, ImageError, ImageInfo,
};
pub use model_manager::{RecognitionEngine, VisionModelInfo, VisionModelManager};
pub use nms::non_max_suppression;
pub use ocr::{MeterDetector, OnnxMeterDetector, OnnxTextRecognizer, RecognitionError, TextRecognizer};
pub use variants::{generate_variants, PreprocessingVariant, VariantKind};
pub use vlm_client::VlmTextRecognizer;

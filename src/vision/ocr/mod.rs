// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX models for the meter reader
//!
//! Components:
//! - `detection` - Meter-window detector
//! - `recognition` - CTC text recognizer and the recognizer trait
//! - `preprocessing` - Tensor preparation for both models

pub mod detection;
pub mod preprocessing;
pub mod recognition;

pub use detection::{parse_detections, MeterDetector, OnnxMeterDetector};
pub use recognition::{ctc_greedy_decode, OnnxTextRecognizer, RecognitionError, TextRecognizer};

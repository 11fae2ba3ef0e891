// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod reading;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::ReaderConfig;
pub use pipeline::MeterReader;
pub use reading::{ReadingError, VariantReading, WaterMeterResult};
pub use vision::{
    BoundingBox, MeterDetector, OnnxMeterDetector, OnnxTextRecognizer, RecognitionEngine,
    RecognitionError, TextRecognizer, VariantKind, VisionModelManager, VlmTextRecognizer,
};

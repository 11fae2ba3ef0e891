// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the water meter reader

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "meter-window-detection",
    "non-max-suppression",
    "four-variant-preprocessing",
    "concurrent-recognition",
    "onnx-ctc-recognizer",
    "vlm-recognizer",
    "look-alike-correction",
    "context-scoring",
    "annotated-output",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Water Meter OCR {}", VERSION_NUMBER)
}

/// Get version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "features": FEATURES,
    })
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the meter reading pipeline

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::nms::DEFAULT_IOU_THRESHOLD;
use crate::vision::ocr::detection::DEFAULT_DETECTION_CONFIDENCE;

/// Pipeline tunables and model locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Overlap above which a lower-scored detection is suppressed
    pub iou_threshold: f32,
    /// Minimum detector score for a box to be kept
    pub detection_confidence: f32,
    /// Fraction of the box size added on each side before cropping
    pub crop_padding: f32,
    /// Per-variant recognition timeout in milliseconds
    pub recognition_timeout_ms: u64,
    /// Maximum accepted image payload in bytes
    pub max_image_bytes: usize,
    /// Draw kept detections onto a copy of the source image
    pub annotate_detections: bool,
    /// Attach the decoded source image (PNG) to the result
    pub include_source_image: bool,
    pub detection_model_path: Option<String>,
    pub recognition_model_path: Option<String>,
    pub dictionary_path: Option<String>,
    /// Base URL of an OpenAI-compatible VLM sidecar
    pub vlm_endpoint: Option<String>,
    pub vlm_model: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
            crop_padding: 0.1,
            recognition_timeout_ms: 15000,
            max_image_bytes: MAX_IMAGE_SIZE,
            annotate_detections: true,
            include_source_image: false,
            detection_model_path: None,
            recognition_model_path: None,
            dictionary_path: None,
            vlm_endpoint: None,
            vlm_model: "qwen2.5-vl".to_string(),
        }
    }
}

/// File layout: all keys live under a `[reader]` table
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    reader: ReaderConfig,
}

impl ReaderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.reader)
    }

    /// Apply `METER_*` environment overrides on top of this configuration
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup; unparsable values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed_with(&lookup, "METER_IOU_THRESHOLD") {
            self.iou_threshold = v;
        }
        if let Some(v) = parsed_with(&lookup, "METER_DETECTION_CONFIDENCE") {
            self.detection_confidence = v;
        }
        if let Some(v) = parsed_with(&lookup, "METER_CROP_PADDING") {
            self.crop_padding = v;
        }
        if let Some(v) = parsed_with(&lookup, "METER_RECOGNITION_TIMEOUT_MS") {
            self.recognition_timeout_ms = v;
        }
        if let Some(v) = parsed_with(&lookup, "METER_MAX_IMAGE_BYTES") {
            self.max_image_bytes = v;
        }
        if let Some(v) = lookup("METER_ANNOTATE") {
            self.annotate_detections = v.to_lowercase() != "false";
        }
        if let Some(v) = lookup("METER_INCLUDE_SOURCE_IMAGE") {
            self.include_source_image = v.to_lowercase() == "true";
        }
        if let Some(v) = lookup("METER_DET_MODEL") {
            self.detection_model_path = Some(v);
        }
        if let Some(v) = lookup("METER_REC_MODEL") {
            self.recognition_model_path = Some(v);
        }
        if let Some(v) = lookup("METER_REC_DICT") {
            self.dictionary_path = Some(v);
        }
        if let Some(v) = lookup("METER_VLM_ENDPOINT") {
            self.vlm_endpoint = Some(v);
        }
        if let Some(v) = lookup("METER_VLM_MODEL") {
            self.vlm_model = v;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("IoU threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err("Detection confidence must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.crop_padding) {
            return Err("Crop padding must be between 0 and 1".to_string());
        }
        if self.recognition_timeout_ms == 0 {
            return Err("Recognition timeout must be greater than 0".to_string());
        }
        if self.max_image_bytes == 0 {
            return Err("Maximum image size must be greater than 0".to_string());
        }
        Ok(())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loads the detector and recognizer named in a [`ReaderConfig`]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ReaderConfig;
use crate::vision::ocr::{MeterDetector, OnnxMeterDetector, OnnxTextRecognizer, TextRecognizer};
use crate::vision::vlm_client::VlmTextRecognizer;

/// Which text-recognition backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionEngine {
    Onnx,
    Vlm,
}

impl FromStr for RecognitionEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "vlm" => Ok(Self::Vlm),
            other => Err(format!("Unknown recognition engine: {}", other)),
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone)]
pub struct VisionModelInfo {
    pub name: String,
    /// "detection" or "recognition"
    pub model_type: String,
    pub available: bool,
}

/// Holds the collaborators the reader is built from
///
/// The detector is optional: a missing or broken detection model is logged
/// and the reader falls back to the whole image. The recognizer is required.
pub struct VisionModelManager {
    detector: Option<Arc<dyn MeterDetector>>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl VisionModelManager {
    pub async fn new(config: &ReaderConfig, engine: RecognitionEngine) -> Result<Self> {
        let detector = match config.detection_model_path {
            Some(ref path) => match OnnxMeterDetector::new(path) {
                Ok(model) => {
                    tracing::info!("Meter detection model loaded from {}", path);
                    Some(Arc::new(model.with_confidence_threshold(config.detection_confidence))
                        as Arc<dyn MeterDetector>)
                }
                Err(e) => {
                    tracing::warn!("Failed to load detection model from {}: {:#}", path, e);
                    None
                }
            },
            None => None,
        };

        let recognizer: Arc<dyn TextRecognizer> = match engine {
            RecognitionEngine::Onnx => {
                let model_path = config
                    .recognition_model_path
                    .as_deref()
                    .context("ONNX engine selected but no recognition model path configured")?;
                let dict_path = config
                    .dictionary_path
                    .as_deref()
                    .context("ONNX engine selected but no dictionary path configured")?;
                Arc::new(OnnxTextRecognizer::new(model_path, dict_path).await?)
            }
            RecognitionEngine::Vlm => {
                let endpoint = config
                    .vlm_endpoint
                    .as_deref()
                    .context("VLM engine selected but no VLM endpoint configured")?;
                let client = VlmTextRecognizer::new(endpoint, &config.vlm_model)?;
                if !client.health_check().await {
                    tracing::warn!("VLM sidecar at {} did not pass its health check", endpoint);
                }
                Arc::new(client)
            }
        };

        Ok(Self {
            detector,
            recognizer,
        })
    }

    pub fn detector(&self) -> Option<Arc<dyn MeterDetector>> {
        self.detector.clone()
    }

    pub fn recognizer(&self) -> Arc<dyn TextRecognizer> {
        self.recognizer.clone()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// List the configured models
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![
            VisionModelInfo {
                name: self
                    .detector
                    .as_ref()
                    .map(|d| d.name())
                    .unwrap_or("none")
                    .to_string(),
                model_type: "detection".to_string(),
                available: self.detector.is_some(),
            },
            VisionModelInfo {
                name: self.recognizer.name().to_string(),
                model_type: "recognition".to_string(),
                available: true,
            },
        ]
    }
}

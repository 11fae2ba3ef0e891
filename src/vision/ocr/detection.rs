// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Meter-window detection
//!
//! The detector locates the digit window of the meter. The reading pipeline
//! depends only on the [`MeterDetector`] trait; [`OnnxMeterDetector`] is the
//! on-device implementation backed by ONNX Runtime.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, Letterbox};
use crate::vision::geometry::BoundingBox;

/// Default minimum score for a detector row to be kept
pub const DEFAULT_DETECTION_CONFIDENCE: f32 = 0.5;

/// Values per detector row: 4 corner points (x, y) followed by the score
const ROW_SCORE_INDEX: usize = 8;

/// Object-detection collaborator
///
/// Implementations must be deterministic for identical input.
pub trait MeterDetector: Send + Sync {
    /// Return raw (pre-NMS) boxes in source-image pixel coordinates
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// ONNX meter-window detector
///
/// Expects a `[1, 3, 640, 640]` letterboxed input and an `[1, N, F]` output
/// where each row carries 4 corner points and a score at index 8.
#[derive(Clone)]
pub struct OnnxMeterDetector {
    /// Session is not reentrant; calls are serialized through the mutex
    session: Arc<Mutex<Session>>,
    input_name: String,
    confidence_threshold: f32,
}

impl std::fmt::Debug for OnnxMeterDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxMeterDetector")
            .field("input_name", &self.input_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl OnnxMeterDetector {
    /// Load the detector model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Meter detection model not found: {}", model_path.display());
        }

        info!("Loading meter detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(1)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "Failed to load meter detection model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            confidence_threshold: DEFAULT_DETECTION_CONFIDENCE,
        })
    }

    /// Set the minimum row score
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

impl MeterDetector for OnnxMeterDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>> {
        let (tensor, fit) = preprocess_for_detection(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output.shape());

        parse_detections(output.view(), &fit, self.confidence_threshold)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Turn a `[1, N, F]` (or `[N, F]`) detector output into source-space boxes
///
/// Rows with fewer than 9 values or a score at or below `threshold` are skipped.
pub fn parse_detections(
    output: ArrayViewD<f32>,
    fit: &Letterbox,
    threshold: f32,
) -> Result<Vec<BoundingBox>> {
    let shape = output.shape().to_vec();
    let (rows, features, batched) = match shape.as_slice() {
        [1, n, f] => (*n, *f, true),
        [n, f] => (*n, *f, false),
        _ => anyhow::bail!("Unexpected detection output shape: {:?}", shape),
    };

    if features <= ROW_SCORE_INDEX {
        return Ok(Vec::new());
    }

    let at = |row: usize, col: usize| {
        if batched {
            output[IxDyn(&[0, row, col])]
        } else {
            output[IxDyn(&[row, col])]
        }
    };

    let mut boxes = Vec::new();
    for row in 0..rows {
        let score = at(row, ROW_SCORE_INDEX);
        if score.is_nan() || score <= threshold {
            continue;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for corner in 0..4 {
            let (x, y) = fit.map_to_source(at(row, corner * 2), at(row, corner * 2 + 1));
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        boxes.push(BoundingBox::from_corners_clamped(
            min_x,
            min_y,
            max_x,
            max_y,
            score,
            fit.source_width,
            fit.source_height,
        ));
    }

    Ok(boxes)
}

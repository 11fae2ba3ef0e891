// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition
//!
//! The reading pipeline only sees the [`TextRecognizer`] trait. Recognizers
//! return raw text; digit cleanup and scoring happen downstream.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::DynamicImage;
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use super::preprocessing::preprocess_for_recognition;

/// Recognition failure for a single variant
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("Recognition engine error: {0}")]
    Engine(String),

    #[error("Recognition timed out")]
    Timeout,

    #[error("Recognizer unavailable: {0}")]
    Unavailable(String),
}

/// Text-recognition collaborator
///
/// Must be safe to call concurrently; the pipeline runs all variants at once.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in `image`, possibly spanning several lines
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError>;

    /// Short engine name for logs and diagnostics
    fn name(&self) -> &'static str;
}

/// ONNX (PP-OCR style) CTC text recognizer
#[derive(Clone)]
pub struct OnnxTextRecognizer {
    session: Arc<Mutex<Session>>,
    /// Index 0 is the CTC blank
    dictionary: Arc<Vec<char>>,
    input_name: String,
}

impl std::fmt::Debug for OnnxTextRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxTextRecognizer")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxTextRecognizer {
    /// Load the recognition model and its character dictionary
    ///
    /// # Errors
    /// Returns error if either file is missing or ONNX Runtime rejects the model.
    pub async fn new<P: AsRef<Path>>(model_path: P, dict_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Text recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!("Character dictionary not found: {}", dict_path.display());
        }

        info!("Loading text recognition model from {}", model_path.display());

        let dictionary = load_dictionary(dict_path)?;
        info!("Loaded character dictionary with {} entries", dictionary.len());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load text recognition model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Recognition model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Blocking inference on one image
    fn recognize_blocking(&self, image: &DynamicImage) -> Result<String> {
        let tensor = preprocess_for_recognition(image);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Recognition session lock poisoned"))?;

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Recognition output shape: {:?}", output.shape());

        ctc_greedy_decode(output.view(), &self.dictionary)
    }
}

#[async_trait]
impl TextRecognizer for OnnxTextRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        let recognizer = self.clone();
        let image = image.clone();

        tokio::task::spawn_blocking(move || recognizer.recognize_blocking(&image))
            .await
            .map_err(|e| RecognitionError::Engine(format!("Recognition task failed: {}", e)))?
            .map_err(|e| RecognitionError::Engine(format!("{:#}", e)))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Load a one-character-per-line dictionary, with the CTC blank prepended
pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<char>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open dictionary: {}", path.as_ref().display()))?;

    let mut dictionary = vec!['\0'];
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read dictionary line")?;
        if let Some(ch) = line.chars().next() {
            dictionary.push(ch);
        }
    }

    if !dictionary[1..].contains(&' ') {
        dictionary.push(' ');
    }

    Ok(dictionary)
}

/// Best-path CTC decoding: argmax per step, collapse repeats, drop blanks
///
/// Accepts `[1, T, C]` or `[T, C]`. Class indices past the dictionary are skipped.
pub fn ctc_greedy_decode(output: ArrayViewD<f32>, dictionary: &[char]) -> Result<String> {
    let shape = output.shape().to_vec();
    let (steps, classes, batched) = match shape.as_slice() {
        [1, t, c] => (*t, *c, true),
        [t, c] => (*t, *c, false),
        _ => anyhow::bail!("Unexpected recognition output shape: {:?}", shape),
    };

    let mut text = String::new();
    let mut prev: Option<usize> = None;

    for t in 0..steps {
        let mut best = 0usize;
        let mut best_prob = f32::NEG_INFINITY;
        for c in 0..classes {
            let prob = if batched {
                output[IxDyn(&[0, t, c])]
            } else {
                output[IxDyn(&[t, c])]
            };
            if prob > best_prob {
                best_prob = prob;
                best = c;
            }
        }

        if best != 0 && Some(best) != prev {
            if let Some(ch) = dictionary.get(best) {
                text.push(*ch);
            }
        }
        prev = if best == 0 { None } else { Some(best) };
    }

    Ok(text)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition through a VLM sidecar speaking the OpenAI-compatible API

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::image_utils::encode_png_base64;
use super::ocr::recognition::{RecognitionError, TextRecognizer};

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

const METER_PROMPT: &str = "This is a photo of a water meter. Transcribe every line of text you can see, \
including the digits of the counter wheels exactly as shown. Return only the text, one line per line in the image.";

/// Sidecar request timeout; the pipeline applies its own per-variant timeout on top
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Recognizer backed by a VLM sidecar
pub struct VlmTextRecognizer {
    client: Client,
    endpoint: String,
    model_name: String,
}

impl VlmTextRecognizer {
    pub fn new(endpoint: &str, model_name: &str) -> Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "VLM recognizer configured: endpoint={}, model={}",
            endpoint, model_name
        );

        Ok(Self {
            client,
            endpoint,
            model_name: model_name.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Check if the VLM sidecar is healthy
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("VLM health check failed: {}", e);
                false
            }
        }
    }

    fn build_request(&self, png_base64: &str) -> ChatRequest {
        let data_url = format!("data:image/png;base64,{}", png_base64);
        ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    {"type": "text", "text": METER_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]),
            }],
            max_tokens: 256,
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl TextRecognizer for VlmTextRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        let png = encode_png_base64(image).map_err(|e| RecognitionError::Engine(e.to_string()))?;
        let request = self.build_request(&png);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecognitionError::Timeout
                } else if e.is_connect() {
                    RecognitionError::Unavailable(e.to_string())
                } else {
                    RecognitionError::Engine(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecognitionError::Engine(format!(
                "VLM sidecar returned HTTP {}",
                status
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Engine(format!("Malformed VLM response: {}", e)))?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "vlm"
    }
}

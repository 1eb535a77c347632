/// OpenAI-compatible chat-completions client for label detection.
///
/// One request per image: system instruction, user turn with text + image,
/// and a strict JSON schema response format. No retries.

use super::prompt::{response_schema, SCHEMA_NAME, SYSTEM_INSTRUCTION, USER_INSTRUCTION};
use super::LabelDetector;
use crate::error::AppError;
use crate::postprocess::mapping::NormalizedBox;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct VisionModelClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl VisionModelClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build model HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LabelDetector for VisionModelClient {
    async fn detect(&self, image_data_uri: &str) -> Result<Vec<NormalizedBox>, AppError> {
        let url = format!("{base_url}/chat/completions", base_url = self.base_url);
        let body = build_request_body(&self.model, image_data_uri);

        info!(model = %self.model, "Requesting label detection");

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Detector(format!("Model request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Detector(format!(
                "Model service returned {status}: {text}"
            )));
        }

        // A body that cannot be read is a transport failure; one that is not JSON is no labels.
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Detector(format!("Reading model reply failed: {e}")))?;

        let reply: Value = match serde_json::from_slice(&body) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Model reply is not JSON, treating as no labels: {e}");
                return Ok(Vec::new());
            }
        };

        let Some(content) = extract_content(&reply) else {
            warn!("Model reply has no message content, treating as no labels");
            return Ok(Vec::new());
        };
        debug!(content, "Model reply content");

        let boxes = parse_boxes(content);
        info!(count = boxes.len(), "Label detection finished");
        Ok(boxes)
    }
}

/// Chat-completions body: system turn, user turn with text + image, strict schema.
pub fn build_request_body(model: &str, image_data_uri: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_INSTRUCTION },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": USER_INSTRUCTION },
                    { "type": "image_url", "image_url": { "url": image_data_uri } }
                ]
            }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": response_schema(),
            }
        }
    })
}

fn extract_content(reply: &Value) -> Option<&str> {
    reply["choices"][0]["message"]["content"].as_str()
}

/// Parse the model's content into boxes; anything but an array of boxes is empty.
pub fn parse_boxes(content: &str) -> Vec<NormalizedBox> {
    let payload = strip_code_fence(content);

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!("Model content is not valid JSON, treating as no labels: {e}");
            return Vec::new();
        }
    };

    if !value.is_array() {
        warn!("Model content is not a JSON array, treating as no labels");
        return Vec::new();
    }

    match serde_json::from_value::<Vec<NormalizedBox>>(value) {
        Ok(boxes) => boxes,
        Err(e) => {
            warn!("Model content does not match the box shape, treating as no labels: {e}");
            Vec::new()
        }
    }
}

/// Unwrap a ```json ... ``` fence if the model added one.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // drop an info string such as `json`, with or without a newline after it
    inner
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .trim()
}

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use crate::coaching::{build_prompt, AnalysisOptions};
use crate::ports::{EncodedFrame, VisionInference};

const URL_ENV: &str = "SHUTTER_COACH_VISION_URL";
const MODEL_ENV: &str = "SHUTTER_COACH_VISION_MODEL";
const API_KEY_ENV: &str = "SHUTTER_COACH_API_KEY";

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct VisionClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for VisionClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            timeout: Duration::from_secs(20),
            max_tokens: 300,
        }
    }
}

impl VisionClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            endpoint: read(URL_ENV).unwrap_or(defaults.endpoint),
            model: read(MODEL_ENV).unwrap_or(defaults.model),
            api_key: read(API_KEY_ENV),
            ..defaults
        }
    }
}

/// OpenAI-compatible `chat/completions` client for coaching inference.
#[derive(Clone)]
pub struct HttpVisionClient {
    http: reqwest::Client,
    config: VisionClientConfig,
}

impl HttpVisionClient {
    pub fn new(config: VisionClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build vision http client")?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl VisionInference for HttpVisionClient {
    async fn infer(&self, frame: &EncodedFrame, options: &AnalysisOptions) -> Result<String> {
        let payload = request_payload(&self.config, frame, options);

        let mut request = self
            .http
            .post(&self.config.endpoint)
            .header("accept", "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .context("vision request transport failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("vision response body read failed")?;
        if !status.is_success() {
            bail!(
                "vision request failed ({}): {}",
                status.as_u16(),
                truncate_text(&body, 512)
            );
        }

        let value: Value =
            serde_json::from_str(&body).context("vision response is not valid JSON")?;
        let content = response_text(&value)?;
        debug!("vision response: {} chars", content.len());
        Ok(content)
    }
}

fn request_payload(
    config: &VisionClientConfig,
    frame: &EncodedFrame,
    options: &AnalysisOptions,
) -> Value {
    let mut content = vec![
        json!({ "type": "text", "text": build_prompt(options) }),
        json!({ "type": "image_url", "image_url": { "url": frame.data_url() } }),
    ];
    if let Some(reference) = options.reference.as_ref() {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": format!("data:image/jpeg;base64,{}", reference.encoded_image) }
        }));
    }

    json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "stream": false,
        "messages": [{
            "role": "user",
            "content": content,
        }],
    })
}

fn response_text(value: &Value) -> Result<String> {
    let content = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .ok_or_else(|| anyhow!("vision response has no message content"))?;

    match content {
        Value::String(text) => Ok(text.clone()),
        // Some providers return content parts instead of a flat string.
        Value::Array(parts) => Ok(parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")),
        other => bail!("unexpected vision message content: {other}"),
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

//! OpenAI-compatible chat completions provider with JSON-object output.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Result, ReviewDeskError};

use super::{ChatProvider, ChatReply, Usage};

/// Chat completions over `{api_base}/chat/completions`.
pub struct OpenAiProvider {
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        Self::with_settings(api_key, model, &LlmConfig::default())
    }

    /// Build from config. Fails when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ReviewDeskError::Config(
                    "No OpenAI API key. Set OPENAI_API_KEY or llm.api_key in the config."
                        .to_string(),
                )
            })?;
        Self::with_settings(key, &config.model, config)
    }

    fn with_settings(api_key: &str, model: &str, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewDeskError::Provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key: api_key.to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: config.temperature,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn build_body(&self, system: &str, human: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": human }
            ]
        })
    }

    fn extract_content(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
    }

    fn extract_usage(response: &Value) -> Usage {
        let usage = &response["usage"];
        Usage::new(
            usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        )
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn chat(&self, system: &str, human: &str) -> Result<ChatReply> {
        debug!(model = %self.model, "OpenAI chat request");

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&self.build_body(system, human))
            .send()
            .await
            .map_err(|e| ReviewDeskError::Provider(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let json: Value = response.json().await.map_err(|e| {
                ReviewDeskError::Provider(format!("Failed to parse OpenAI response: {}", e))
            })?;
            return Ok(ChatReply {
                content: Self::extract_content(&json).unwrap_or_default(),
                usage: Self::extract_usage(&json),
            });
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);
        Err(ReviewDeskError::Provider(format!(
            "OpenAI API error ({}): {}",
            status.as_u16(),
            message
        )))
    }
}

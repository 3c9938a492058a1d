use crate::buffer_utils::parse_line_stream;
use crate::ollama::OllamaChatParser;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, EventStream};
use crate::types::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

pub const OLLAMA_API_BASE: &str = "http://localhost:11434";

/// Client for a local Ollama server
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OLLAMA_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn build_chat_request(
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let mut request = serde_json::json!({
            "model": model,
            "messages": serde_json::to_value(messages)?,
            "stream": stream,
        });

        let mut model_options = serde_json::Map::new();
        if let Some(temp) = options.temperature {
            model_options.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            model_options.insert("num_predict".to_string(), serde_json::json!(max_tokens));
        }
        if !model_options.is_empty() {
            if let Some(obj) = request.as_object_mut() {
                obj.insert("options".to_string(), Value::Object(model_options));
            }
        }

        Ok(request)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = Self::build_chat_request(
            &request.model,
            &request.messages,
            &request.options,
            true,
        )?;

        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "opening ollama chat stream"
        );

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({}): {}", status, error_text);
        }

        Ok(parse_line_stream(response.bytes_stream(), OllamaChatParser))
    }
}

// Provider configuration and the factory that turns it into a client

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::traits::ChatClient;

/// Type of completion provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Ollama,
    OpenAI,
}

/// Configuration for an Ollama server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Defaults to http://localhost:11434
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Configuration for OpenAI or any compatible server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    /// Defaults to https://api.openai.com/v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Provider-specific configuration details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama(OllamaConfig),
    OpenAI(OpenAIConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Ollama(OllamaConfig::default())
    }
}

impl ProviderConfig {
    pub fn ollama() -> Self {
        Self::Ollama(OllamaConfig::default())
    }

    pub fn ollama_at(base_url: impl Into<String>) -> Self {
        Self::Ollama(OllamaConfig {
            base_url: Some(base_url.into()),
        })
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAI(OpenAIConfig::new(api_key))
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Ollama(_) => ProviderType::Ollama,
            Self::OpenAI(_) => ProviderType::OpenAI,
        }
    }
}

/// Factory for creating chat clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        tracing::info!(provider = ?config.provider_type(), "creating chat client");

        match config {
            ProviderConfig::Ollama(ollama) => {
                let client = match ollama.base_url {
                    Some(url) => crate::ollama::OllamaClient::with_base_url(url)?,
                    None => crate::ollama::OllamaClient::new()?,
                };
                Ok(Arc::new(client))
            }
            ProviderConfig::OpenAI(openai) => {
                let mut client = crate::openai::OpenAIClient::new(openai.api_key)?;
                if let Some(url) = openai.base_url {
                    client = client.with_base_url(url);
                }
                Ok(Arc::new(client))
            }
        }
    }
}

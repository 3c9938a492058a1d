use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thinkchat::llm::{OllamaConfig, OpenAIConfig, ProviderConfig, ProviderType};
use thinkchat::persist::StoreConfig;
use thinkchat::types::{ContextPolicy, ConversationConfig, LLMConfig, MarkerMode, PartialPolicy};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default, skip_deserializing)]
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderType,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::default(),
            model: LLMConfig::default().model,
            base_url: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl From<&LlmConfig> for LLMConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub context: ContextPolicy,
    #[serde(default)]
    pub marker_mode: MarkerMode,
    #[serde(default)]
    pub partial_policy: PartialPolicy,
    pub timeout_secs: Option<u64>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables such as `THINKCHAT_LLM__MODEL` or
    ///    `THINKCHAT_STORE__PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(Self::environment());

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.load_secrets();
        Ok(cfg)
    }

    /// Load config from a specific file, still honouring environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Self::environment());

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.load_secrets();
        Ok(cfg)
    }

    fn environment() -> Environment {
        Environment::with_prefix("THINKCHAT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_secrets(&mut self) {
        // OpenAI-compatible local servers usually need no key
        self.openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    }

    pub fn provider_config(&self) -> ProviderConfig {
        match self.llm.provider {
            ProviderType::Ollama => ProviderConfig::Ollama(OllamaConfig {
                base_url: self.llm.base_url.clone(),
            }),
            ProviderType::OpenAI => ProviderConfig::OpenAI(OpenAIConfig {
                api_key: self.openai_api_key.clone(),
                base_url: self.llm.base_url.clone(),
            }),
        }
    }

    pub fn conversation_config(&self) -> ConversationConfig {
        let mut config = ConversationConfig::new(LLMConfig::from(&self.llm))
            .with_context_policy(self.chat.context)
            .with_marker_mode(self.chat.marker_mode)
            .with_partial_policy(self.chat.partial_policy);

        if let Some(secs) = self.chat.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(prompt) = &self.chat.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [llm]
            provider = "openai"
            model = "gpt-4o-mini"
            base_url = "http://localhost:8080/v1"
            temperature = 0.5

            [store]
            backend = "mongodb"
            uri = "mongodb://localhost:27017"
            database = "chat"

            [chat]
            marker_mode = "buffered"
            partial_policy = "persist"
            timeout_secs = 30

            [chat.context]
            type = "last_k"
            k = 6

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.provider, ProviderType::OpenAI);
        assert_eq!(
            config.store,
            StoreConfig::Mongodb {
                uri: "mongodb://localhost:27017".into(),
                database: "chat".into()
            }
        );

        let conversation = config.conversation_config();
        assert_eq!(conversation.context_policy, ContextPolicy::LastK { k: 6 });
        assert_eq!(conversation.marker_mode, MarkerMode::Buffered);
        assert_eq!(conversation.partial_policy, PartialPolicy::Persist);
        assert_eq!(conversation.stream_timeout, Some(Duration::from_secs(30)));
        assert_eq!(conversation.llm.temperature, Some(0.5));

        match config.provider_config() {
            ProviderConfig::OpenAI(openai) => {
                assert_eq!(openai.base_url.as_deref(), Some("http://localhost:8080/v1"))
            }
            other => panic!("expected openai, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.llm.model, "deepseek-r1:1.5b");
        assert_eq!(config.llm.provider, ProviderType::Ollama);
        assert!(matches!(config.store, StoreConfig::Sqlite { .. }));
        assert_eq!(config.logging.level, "warn");

        let conversation = config.conversation_config();
        assert_eq!(conversation.context_policy, ContextPolicy::CurrentMessage);
        assert!(conversation.stream_timeout.is_none());
    }

    #[test]
    fn test_from_file_reads_shipped_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let config = Config::from_file(path).unwrap();

        assert_eq!(config.llm.model, "deepseek-r1:1.5b");
        assert_eq!(
            config.store,
            StoreConfig::Sqlite { path: "thinkchat.db".into() }
        );
        assert_eq!(config.chat.marker_mode, MarkerMode::Fragment);
    }

    #[test]
    fn test_from_file_reads_custom_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.toml");
        std::fs::write(
            &path,
            r#"
                [llm]
                model = "qwq"

                [store]
                backend = "memory"

                [chat]
                system_prompt = "Answer in one line."
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.llm.model, "qwq");
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(
            config.conversation_config().system_prompt.as_deref(),
            Some("Answer in one line.")
        );
    }
}

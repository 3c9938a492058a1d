use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model selection and sampling options for a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self::new("deepseek-r1:1.5b")
    }
}

/// Which persisted turns accompany a new user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextPolicy {
    /// Only the message being sent
    CurrentMessage,
    /// The last `k` persisted messages of the thread, the new one included
    LastK { k: usize },
    AllMessages,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self::CurrentMessage
    }
}

/// How the segmenter recognises `<think>` / `</think>` markers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerMode {
    /// Each fragment is inspected on its own; a fragment containing a
    /// marker is dropped whole.
    #[default]
    Fragment,
    /// Markers are matched against the accumulated text, so a marker split
    /// across fragments is still recognised and surrounding text is kept.
    Buffered,
}

/// What happens to partial output when a stream fails or is cancelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPolicy {
    #[default]
    Discard,
    /// Commit whatever was accumulated as an assistant message
    Persist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationConfig {
    pub llm: LLMConfig,
    pub context_policy: ContextPolicy,
    pub marker_mode: MarkerMode,
    pub partial_policy: PartialPolicy,
    /// Upper bound for a whole completion stream; `None` waits forever
    pub stream_timeout: Option<Duration>,
    pub system_prompt: Option<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            context_policy: ContextPolicy::default(),
            marker_mode: MarkerMode::default(),
            partial_policy: PartialPolicy::default(),
            stream_timeout: None,
            system_prompt: None,
        }
    }
}

impl ConversationConfig {
    pub fn new(llm: LLMConfig) -> Self {
        Self {
            llm,
            ..Self::default()
        }
    }

    pub fn with_context_policy(mut self, policy: ContextPolicy) -> Self {
        self.context_policy = policy;
        self
    }

    pub fn with_marker_mode(mut self, mode: MarkerMode) -> Self {
        self.marker_mode = mode;
        self
    }

    pub fn with_partial_policy(mut self, policy: PartialPolicy) -> Self {
        self.partial_policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One persisted turn of a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    /// Final answer, markdown
    pub content: String,
    /// Reasoning shown separately from the answer; empty for user turns
    pub thought: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller of [`crate::ChatStore::append_message`];
/// the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    pub thought: String,
}

impl NewMessage {
    pub fn user(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: MessageRole::User,
            content: content.into(),
            thought: String::new(),
        }
    }

    pub fn assistant(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        thought: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            thought: thought.into(),
        }
    }

    pub(crate) fn into_message(self, created_at: DateTime<Utc>) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: self.thread_id,
            role: self.role,
            content: self.content,
            thought: self.thought,
            created_at,
        }
    }
}

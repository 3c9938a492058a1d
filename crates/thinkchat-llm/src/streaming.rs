use serde::{Deserialize, Serialize};

/// Provider-agnostic event yielded by a streaming completion.
///
/// `Message` carries one fragment of generated text exactly as the
/// service delivered it. Reasoning markers such as `<think>` are not
/// interpreted here; that is the segmenter's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

impl StreamEvent {
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
        }
    }

    pub fn done(finish_reason: Option<String>) -> Self {
        Self::Done { finish_reason }
    }

    /// Text fragment carried by this event, if any
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::Message { content } => Some(content),
            Self::Done { .. } => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

use serde::{Deserialize, Serialize};

/// Segmenter state: reasoning first, then the answer. Never goes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Thinking,
    Responding,
}

/// Transient buffers shown while a reply is streaming
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingDisplay {
    pub thought: String,
    pub response: String,
}

impl StreamingDisplay {
    pub fn is_empty(&self) -> bool {
        self.thought.is_empty() && self.response.is_empty()
    }
}

/// Lifecycle of one submission, in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// User message persisted, completion request about to open
    Started {
        user_message_id: String,
    },

    /// Text appended to the thought buffer
    Thought {
        content: String,
    },

    /// Text appended to the response buffer
    Response {
        content: String,
    },

    PhaseChanged {
        phase: Phase,
    },

    /// Assistant message persisted; terminal
    Committed {
        message_id: String,
    },

    /// Stopped by the caller; terminal. Carries the id of the partial
    /// assistant message when partial output was kept.
    Cancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    /// Stream, timeout or storage failure; terminal
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
}

impl ViewEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed { .. } | Self::Cancelled { .. } | Self::Error { .. }
        )
    }
}

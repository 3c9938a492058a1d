use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::buffer_utils::LineParser;
use crate::streaming::StreamEvent;

/// One `data:` payload of a chat-completions SSE stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }

    fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(content) = self.content() {
            if !content.is_empty() {
                events.push(StreamEvent::message(content));
            }
        }

        if let Some(finish_reason) = self.finish_reason() {
            events.push(StreamEvent::done(Some(finish_reason.to_string())));
        }

        events
    }
}

/// Parses `text/event-stream` bodies from `/chat/completions`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatCompletionsParser;

impl LineParser for ChatCompletionsParser {
    fn parse_line(&self, line: &str) -> Result<Vec<StreamEvent>> {
        // `event:`/`id:` fields and `:` comments carry nothing we use
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(Vec::new());
        };
        let data = data.trim_start();

        if data == "[DONE]" {
            return Ok(vec![StreamEvent::done(None)]);
        }

        let chunk: ChatStreamChunk = serde_json::from_str(data)
            .map_err(|e| anyhow::anyhow!("Failed to parse chat chunk: {}", e))?;
        Ok(chunk.to_stream_events())
    }
}

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageRole, Thread};

/// MongoDB-specific Thread model with BSON dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// MongoDB-specific Message model with BSON dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    pub thought: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&Thread> for MongoThread {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id.clone(),
            title: thread.title.clone(),
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
        }
    }
}

impl From<&Message> for MongoMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            role: message.role,
            content: message.content.clone(),
            thought: message.thought.clone(),
            created_at: message.created_at,
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(message: MongoMessage) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            content: message.content,
            thought: message.thought,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_round_trips_through_bson() {
        let thread = Thread::new("Mongo", Utc::now());
        let doc = bson::to_document(&MongoThread::from(&thread)).unwrap();
        assert!(doc.get_str("_id").is_ok());
        assert!(doc.get_datetime("updated_at").is_ok());

        let back: MongoThread = bson::from_document(doc).unwrap();
        assert_eq!(Thread::from(back).id, thread.id);
    }
}

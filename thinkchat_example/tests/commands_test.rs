use anyhow::Result;
use async_trait::async_trait;
use futures::stream;
use std::sync::Arc;
use thinkchat::llm::{ChatClient, ChatRequest, EventStream, StreamEvent};
use thinkchat::prelude::*;
use thinkchat_example::commands;

struct EchoClient;

#[async_trait]
impl ChatClient for EchoClient {
    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let question = request
            .messages
            .last()
            .map(|m| m.content().to_string())
            .unwrap_or_default();
        let events = vec![
            Ok(StreamEvent::message("<think>")),
            Ok(StreamEvent::message("user asked")),
            Ok(StreamEvent::message("</think>")),
            Ok(StreamEvent::message(format!("echo: {}", question))),
            Ok(StreamEvent::done(None)),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

async fn app() -> ChatApp {
    AppBuilder::new()
        .store(StoreConfig::Memory)
        .client(Arc::new(EchoClient))
        .build()
        .await
        .unwrap()
}

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_new_then_list_threads() {
    let app = app().await;
    let mut out = Vec::new();
    commands::list_threads(&app, &mut out).await.unwrap();
    assert!(text(out).contains("No threads yet"));

    let mut out = Vec::new();
    let thread = commands::new_thread(&app, "Demo", &mut out).await.unwrap();
    assert_eq!(text(out).trim(), thread.id);

    let mut out = Vec::new();
    commands::list_threads(&app, &mut out).await.unwrap();
    let listing = text(out);
    assert!(listing.contains(&thread.id));
    assert!(listing.contains("Demo"));
}

#[tokio::test]
async fn test_send_streams_reply_and_history_shows_it() {
    let app = app().await;
    let thread = app.create_thread("Demo").await.unwrap();

    let mut out = Vec::new();
    let terminal = commands::send_message(&app, &thread.id, "hi there", &mut out)
        .await
        .unwrap();
    assert!(matches!(terminal, ViewEvent::Committed { .. }));
    assert_eq!(text(out), "thought> user asked\nassistant> echo: hi there\n");

    let mut out = Vec::new();
    commands::show_history(&app, &thread.id, &mut out).await.unwrap();
    let history = text(out);
    assert!(history.starts_with("# Demo"));
    assert!(history.contains("you> hi there"));
    assert!(history.contains("  | user asked"));
    assert!(history.contains("assistant> echo: hi there"));
}

#[tokio::test]
async fn test_history_of_unknown_thread_fails() {
    let app = app().await;
    let mut out = Vec::new();
    let err = commands::show_history(&app, "missing", &mut out).await.unwrap_err();
    assert!(err.to_string().contains("thread not found"));
}

#[tokio::test]
async fn test_chat_loop_until_exit() {
    let app = app().await;
    let thread = app.create_thread("Loop").await.unwrap();

    let input: &[u8] = b"first\n\n   \nsecond\n/exit\nnever sent\n";
    let mut out = Vec::new();
    commands::chat_loop(&app, &thread.id, input, &mut out).await.unwrap();

    let messages = app.history(&thread.id).await.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "echo: first", "second", "echo: second"]);
    assert!(app.send(&thread.id, "late").await.is_err());
}

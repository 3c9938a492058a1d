//! Streams one reply from a local Ollama server into an in-memory thread
//!
//! # Usage
//!
//! ```bash
//! ollama pull deepseek-r1:1.5b
//! cargo run --example demo_thread -- "Why is the sky blue?"
//! ```

use std::io::Write;
use thinkchat::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is 2+2?".to_string());

    let app = AppBuilder::new()
        .store(StoreConfig::Memory)
        .provider(ProviderConfig::ollama())
        .build()
        .await?;

    let thread = app.create_thread("Demo").await?;
    let mut reply = app.send(&thread.id, &question).await?;

    while let Some(event) = reply.events.recv().await {
        match event {
            ViewEvent::Thought { content } => print!("\x1b[2m{}\x1b[0m", content),
            ViewEvent::PhaseChanged { .. } => println!("\n"),
            ViewEvent::Response { content } => print!("{}", content),
            ViewEvent::Committed { message_id } => {
                println!("\n\n(saved as {})", message_id);
                break;
            }
            ViewEvent::Error { message, .. } => {
                eprintln!("\nerror: {}", message);
                break;
            }
            ViewEvent::Cancelled { .. } => break,
            ViewEvent::Started { .. } => {}
        }
        std::io::stdout().flush()?;
    }

    for message in app.history(&thread.id).await? {
        println!("[{}] {} chars", message.role.as_str(), message.content.len());
    }
    Ok(())
}

use anyhow::Result;
use futures::StreamExt;
use thinkchat_llm::{ChatClient, ChatRequest, Message, OllamaClient, StreamEvent};

#[tokio::main]
async fn main() -> Result<()> {
    let client = OllamaClient::new()?;

    let request = ChatRequest::new(
        "deepseek-r1:1.5b",
        vec![Message::human("Why is the sky blue? Answer in one sentence.")],
    );

    let mut stream = client.chat_stream(request).await?;

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Message { content } => {
                print!("{}", content);
                std::io::Write::flush(&mut std::io::stdout())?;
            }
            StreamEvent::Done { finish_reason } => {
                println!("\n\nDone ({}).", finish_reason.unwrap_or_default());
            }
        }
    }

    Ok(())
}

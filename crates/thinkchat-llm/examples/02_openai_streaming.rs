use anyhow::Result;
use futures::StreamExt;
use thinkchat_llm::{ChatClient, ChatOptions, ChatRequest, Message, OpenAIClient};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let base_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let client = OpenAIClient::new(api_key)?.with_base_url(base_url);

    let request = ChatRequest::new("gpt-4o-mini", vec![Message::human("Say hello.")])
        .with_options(ChatOptions::new().max_tokens(64));

    let mut stream = client.chat_stream(request).await?;
    while let Some(event) = stream.next().await {
        if let Some(fragment) = event?.fragment() {
            print!("{}", fragment);
        }
    }
    println!();

    Ok(())
}

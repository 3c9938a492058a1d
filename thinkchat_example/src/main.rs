use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thinkchat::prelude::*;
use thinkchat_example::{commands, init_logging, Config};

/// Chat with local reasoning models from the terminal
#[derive(Parser, Debug)]
#[command(name = "thinkchat", version, about)]
struct Cli {
    /// Configuration file; defaults to config/default.toml and config/{ENV}.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List threads, most recently active first
    Threads,
    /// Create a thread and print its id
    New { title: String },
    /// Print the messages of a thread
    History { thread_id: String },
    /// Send one message and stream the reply
    Send {
        thread_id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Interactive chat in a thread
    Chat { thread_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);
    tracing::debug!(provider = ?config.llm.provider, model = %config.llm.model, "config loaded");

    let app = AppBuilder::new()
        .store(config.store.clone())
        .provider(config.provider_config())
        .conversation(config.conversation_config())
        .build()
        .await?;

    let mut out = std::io::stdout();
    match cli.command {
        Command::Threads => commands::list_threads(&app, &mut out).await?,
        Command::New { title } => {
            commands::new_thread(&app, &title, &mut out).await?;
        }
        Command::History { thread_id } => commands::show_history(&app, &thread_id, &mut out).await?,
        Command::Send { thread_id, text } => {
            let text = text.join(" ");
            if let ViewEvent::Error { message, .. } =
                commands::send_message(&app, &thread_id, &text, &mut out).await?
            {
                anyhow::bail!(message);
            }
        }
        Command::Chat { thread_id } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::chat_loop(&app, &thread_id, stdin, &mut out).await?;
        }
    }

    Ok(())
}

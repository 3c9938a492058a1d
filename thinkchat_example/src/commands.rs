use anyhow::{bail, Context, Result};
use std::io::Write;
use thinkchat::prelude::*;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub async fn list_threads(app: &ChatApp, out: &mut impl Write) -> Result<()> {
    let threads = app.threads().await?;
    if threads.is_empty() {
        writeln!(out, "No threads yet. Create one with `thinkchat new <title>`.")?;
        return Ok(());
    }

    for thread in threads {
        writeln!(
            out,
            "{}  {}  {}",
            thread.id,
            thread.updated_at.format("%Y-%m-%d %H:%M:%S"),
            thread.title
        )?;
    }
    Ok(())
}

pub async fn new_thread(app: &ChatApp, title: &str, out: &mut impl Write) -> Result<Thread> {
    let thread = app.create_thread(title).await?;
    writeln!(out, "{}", thread.id)?;
    Ok(thread)
}

async fn require_thread(app: &ChatApp, thread_id: &str) -> Result<Thread> {
    app.thread(thread_id)
        .await?
        .with_context(|| format!("thread not found: {}", thread_id))
}

pub async fn show_history(app: &ChatApp, thread_id: &str, out: &mut impl Write) -> Result<()> {
    let thread = require_thread(app, thread_id).await?;
    writeln!(out, "# {}", thread.title)?;

    for message in app.history(thread_id).await? {
        write_message(out, &message)?;
    }
    Ok(())
}

fn write_message(out: &mut impl Write, message: &Message) -> Result<()> {
    writeln!(out)?;
    match message.role {
        MessageRole::User => writeln!(out, "you> {}", message.content)?,
        MessageRole::Assistant => {
            let thought = message.thought.trim();
            if !thought.is_empty() {
                for line in thought.lines() {
                    writeln!(out, "  | {}", line)?;
                }
            }
            writeln!(out, "assistant> {}", message.content.trim())?;
        }
    }
    Ok(())
}

/// Send one message and print the reply as it streams; Ctrl-C cancels it.
pub async fn send_message(
    app: &ChatApp,
    thread_id: &str,
    text: &str,
    out: &mut impl Write,
) -> Result<ViewEvent> {
    let submission = app.send(thread_id, text).await?;
    stream_reply(submission, out).await
}

async fn stream_reply(mut submission: Submission, out: &mut impl Write) -> Result<ViewEvent> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = submission.events.recv() => {
                let Some(event) = event else {
                    bail!("reply ended without a result");
                };
                match &event {
                    ViewEvent::Started { .. } => write!(out, "thought> ")?,
                    ViewEvent::Thought { content } => write!(out, "{}", content)?,
                    ViewEvent::PhaseChanged { .. } => write!(out, "\nassistant> ")?,
                    ViewEvent::Response { content } => write!(out, "{}", content)?,
                    ViewEvent::Committed { .. } => writeln!(out)?,
                    ViewEvent::Cancelled { .. } => writeln!(out, "\n[cancelled]")?,
                    ViewEvent::Error { message, .. } => writeln!(out, "\n[error] {}", message)?,
                }
                out.flush()?;
                if event.is_terminal() {
                    return Ok(event);
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                submission.cancel();
            }
        }
    }
}

/// Interactive loop over `input` until end of input, `/exit` or Ctrl-C
pub async fn chat_loop<R>(
    app: &ChatApp,
    thread_id: &str,
    input: R,
    out: &mut impl Write,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    show_history(app, thread_id, out).await?;
    writeln!(out, "\n(/exit to quit)")?;

    let mut lines = input.lines();
    loop {
        write!(out, "\nyou> ")?;
        out.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            _ => {}
        }

        match send_message(app, thread_id, &line, out).await {
            Ok(_) => {}
            // Busy or storage errors end this turn, not the session
            Err(e) => writeln!(out, "[error] {:#}", e)?,
        }
    }

    app.shutdown();
    Ok(())
}

use anyhow::anyhow;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thinkchat_llm::{ChatClient, ChatOptions, ChatRequest, Message as Turn, StreamEvent};
use thinkchat_persist::{ChatStore, Message, MessageRole, NewMessage};
use thinkchat_types::{
    ContextPolicy, ConversationConfig, PartialPolicy, Phase, StreamingDisplay, ViewEvent,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ChatError;
use crate::segmenter::{SegmentDelta, StreamSegmenter};

const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Sends messages in a thread and streams the assistant's reply
///
/// One reply streams at a time per view; [`submit`](Self::submit) fails with
/// [`ChatError::Busy`] until the previous submission reaches its terminal
/// event.
pub struct ConversationView {
    store: Arc<dyn ChatStore>,
    client: Arc<dyn ChatClient>,
    config: ConversationConfig,
    busy: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

/// Handle to one in-flight reply
pub struct Submission {
    /// The persisted user message
    pub user_message: Message,
    /// `Started`, deltas, then exactly one terminal event
    ///
    /// Deltas are dropped while the channel is full; `display` always holds
    /// the full text, so a caller may render from it and never read here.
    pub events: mpsc::Receiver<ViewEvent>,
    /// Accumulated buffers; reset to empty once the reply ends
    pub display: watch::Receiver<StreamingDisplay>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Submission {
    /// Stop streaming; the task still emits `Cancelled` and applies the
    /// partial-output policy.
    ///
    /// A reply that is already complete when the task next runs is committed
    /// and ends with `Committed`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain events until the terminal one and wait for the task to exit
    pub async fn finished(mut self) -> Option<ViewEvent> {
        let mut terminal = None;
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                terminal = Some(event);
                break;
            }
        }
        if let Err(e) = self.handle.await {
            tracing::error!("conversation task failed: {}", e);
        }
        terminal
    }
}

/// Clears the busy flag when dropped
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Outcome {
    Completed,
    Failed(String),
    Cancelled,
}

impl ConversationView {
    pub fn new(
        store: Arc<dyn ChatStore>,
        client: Arc<dyn ChatClient>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
            busy: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::ConversationViewBuilder {
        crate::builder::ConversationViewBuilder::new()
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Cancel any in-flight reply and refuse further submissions
    pub fn shutdown(&self) {
        tracing::info!("conversation view shutting down");
        self.shutdown.cancel();
    }

    /// Persist `input` as a user message in `thread_id` and start streaming
    /// the reply in a background task.
    ///
    /// Nothing is written when this returns an error.
    pub async fn submit(&self, thread_id: &str, input: &str) -> Result<Submission, ChatError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.shutdown.is_cancelled() {
            return Err(ChatError::Closed);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let history = match self.config.context_policy {
            ContextPolicy::CurrentMessage => Vec::new(),
            ContextPolicy::LastK { .. } | ContextPolicy::AllMessages => {
                self.store.list_messages(thread_id).await?
            }
        };
        let user_message = self
            .store
            .append_message(NewMessage::user(thread_id, input))
            .await?;
        let request = self.build_request(&history, trimmed);

        tracing::debug!(
            thread_id,
            model = %self.config.llm.model,
            turns = request.messages.len(),
            "starting reply stream"
        );

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (display_tx, display_rx) = watch::channel(StreamingDisplay::default());
        let cancel = self.shutdown.child_token();

        let run = Run {
            store: Arc::clone(&self.store),
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            thread_id: thread_id.to_string(),
            events: event_tx,
            display: display_tx,
        };
        let user_message_id = user_message.id.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            run.execute(user_message_id, request, token, guard).await;
        });

        Ok(Submission {
            user_message,
            events: event_rx,
            display: display_rx,
            cancel,
            handle,
        })
    }

    /// Turns for the completion request. `history` is the thread as it was
    /// before the new message was persisted.
    fn build_request(&self, history: &[Message], trimmed: &str) -> ChatRequest {
        let mut turns = Vec::new();
        if let Some(prompt) = &self.config.system_prompt {
            turns.push(Turn::system(prompt.clone()));
        }

        let prior = match self.config.context_policy {
            ContextPolicy::CurrentMessage => &history[..0],
            ContextPolicy::LastK { k } => &history[history.len().saturating_sub(k.saturating_sub(1))..],
            ContextPolicy::AllMessages => history,
        };
        // Prior turns carry only their content, never the thought
        turns.extend(prior.iter().map(|message| match message.role {
            MessageRole::User => Turn::human(message.content.clone()),
            MessageRole::Assistant => Turn::ai(message.content.clone()),
        }));
        turns.push(Turn::human(trimmed));

        let mut options = ChatOptions::new();
        if let Some(temp) = self.config.llm.temperature {
            options = options.temperature(temp);
        }
        if let Some(max_tokens) = self.config.llm.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        ChatRequest::new(self.config.llm.model.clone(), turns).with_options(options)
    }
}

/// State moved into the background task of one submission
struct Run {
    store: Arc<dyn ChatStore>,
    client: Arc<dyn ChatClient>,
    config: ConversationConfig,
    thread_id: String,
    events: mpsc::Sender<ViewEvent>,
    display: watch::Sender<StreamingDisplay>,
}

impl Run {
    async fn execute(
        self,
        user_message_id: String,
        request: ChatRequest,
        cancel: CancellationToken,
        busy: BusyGuard,
    ) {
        // A dropped receiver only means nobody is watching; the reply still commits
        let _ = self.events.send(ViewEvent::Started { user_message_id }).await;
        // Slot for the terminal event, so a full channel never holds it back
        let terminal_slot = self.events.clone().reserve_owned().await.ok();

        let mut segmenter = StreamSegmenter::new(self.config.marker_mode);
        let outcome = tokio::select! {
            biased;
            result = self.drive(request, &mut segmenter) => match result {
                Ok(()) => Outcome::Completed,
                Err(e) => Outcome::Failed(e.to_string()),
            },
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        // Only non-empty after an interrupted stream
        let tail = segmenter.flush();
        self.publish(tail, &segmenter);
        let keep_partial = self.config.partial_policy == PartialPolicy::Persist && !segmenter.is_empty();
        let segments = segmenter.finish();

        let terminal = match outcome {
            Outcome::Completed => match self.commit(segments.response, segments.thought).await {
                Ok(message) => {
                    tracing::info!(thread_id = %self.thread_id, message_id = %message.id, "reply committed");
                    ViewEvent::Committed { message_id: message.id }
                }
                Err(message) => ViewEvent::Error { message, message_id: None },
            },
            Outcome::Failed(message) => {
                tracing::warn!(thread_id = %self.thread_id, "reply stream failed: {}", message);
                let message_id = if keep_partial {
                    self.commit(segments.response, segments.thought).await.ok().map(|m| m.id)
                } else {
                    None
                };
                ViewEvent::Error { message, message_id }
            }
            Outcome::Cancelled => {
                tracing::info!(thread_id = %self.thread_id, "reply cancelled");
                let message_id = if keep_partial {
                    self.commit(segments.response, segments.thought).await.ok().map(|m| m.id)
                } else {
                    None
                };
                ViewEvent::Cancelled { message_id }
            }
        };

        self.display.send_replace(StreamingDisplay::default());
        drop(busy);
        if let Some(slot) = terminal_slot {
            slot.send(terminal);
        }
    }

    async fn drive(&self, request: ChatRequest, segmenter: &mut StreamSegmenter) -> anyhow::Result<()> {
        let streaming = self.stream_into(request, segmenter);
        match self.config.stream_timeout {
            Some(limit) => tokio::time::timeout(limit, streaming)
                .await
                .map_err(|_| anyhow!("no complete reply within {:?}", limit))?,
            None => streaming.await,
        }
    }

    async fn stream_into(&self, request: ChatRequest, segmenter: &mut StreamSegmenter) -> anyhow::Result<()> {
        let mut stream = self.client.chat_stream(request).await?;

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Message { content } => {
                    let delta = segmenter.push(&content);
                    self.publish(delta, segmenter);
                }
                StreamEvent::Done { finish_reason } => {
                    tracing::debug!(?finish_reason, "reply stream done");
                    break;
                }
            }
        }

        let delta = segmenter.flush();
        self.publish(delta, segmenter);
        Ok(())
    }

    fn publish(&self, delta: SegmentDelta, segmenter: &StreamSegmenter) {
        if delta.is_empty() {
            return;
        }
        // Display first so it already reflects a delta when its event arrives
        self.display.send_replace(segmenter.snapshot());
        if !delta.thought.is_empty() {
            self.emit(ViewEvent::Thought { content: delta.thought });
        }
        if delta.phase_changed {
            self.emit(ViewEvent::PhaseChanged { phase: Phase::Responding });
        }
        if !delta.response.is_empty() {
            self.emit(ViewEvent::Response { content: delta.response });
        }
    }

    async fn commit(&self, content: String, thought: String) -> Result<Message, String> {
        self.store
            .append_message(NewMessage::assistant(&self.thread_id, content, thought))
            .await
            .map_err(|e| {
                tracing::error!(thread_id = %self.thread_id, "failed to persist reply: {}", e);
                e.to_string()
            })
    }

    fn emit(&self, event: ViewEvent) {
        // Never waits on the receiver; the reply commits whether or not anyone reads
        if let Err(mpsc::error::TrySendError::Full(_)) = self.events.try_send(event) {
            tracing::trace!(thread_id = %self.thread_id, "event channel full, delta dropped");
        }
    }
}

//! Streaming chat sessions and the conversation they belong to.
//!
//! A [`StreamingChatSession`] owns one exchange: it sends the user message,
//! reads the response stream on a spawned driver task, assembles the assistant
//! message from the decoded frames and publishes a snapshot after every
//! change. The driver owns the assistant message until the exchange ends;
//! [`StreamingChatSession::finish`] hands back the final, immutable pair.

use std::sync::Arc;

use chat_adapter::{ChatRequest, ChatTransport, FrameDecoder, Record, StreamFrame};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::message::{ChatMessage, ReasoningPart, ToolCallUpdate};

/// Snapshot buffer size used when none is configured.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not started.
    Idle,
    /// Request sent, waiting for the response body.
    Sending,
    /// Reading frames.
    Streaming,
    /// The response finished normally.
    Completed,
    /// The caller cancelled; partial content is kept.
    Cancelled,
    /// The response failed.
    Errored,
}

impl SessionState {
    /// Whether no further changes will happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }
}

/// Identifiers sent along with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    /// Project the conversation belongs to.
    pub project_id: String,
    /// Folder scoping the documents in play.
    pub parent_folder_id: Option<String>,
    /// Documents attached to the message.
    pub file_ids: Vec<String>,
    /// Existing conversation to continue.
    pub conversation_id: Option<String>,
}

/// The assistant message as of one state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    /// Session state at the time of the snapshot.
    pub state: SessionState,
    /// Assistant message so far.
    pub message: ChatMessage,
}

/// The finished pair of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExchange {
    /// Terminal state.
    pub state: SessionState,
    /// The message that was sent.
    pub user: ChatMessage,
    /// The reply, possibly partial or replaced by a failure notice.
    pub assistant: ChatMessage,
}

/// Snapshots published by a running session.
pub type SnapshotStream = ReceiverStream<ChatSnapshot>;

/// Misuse of a session or conversation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` was called twice on the same session.
    #[error("session already started")]
    AlreadyStarted,

    /// `finish` was called before `start`.
    #[error("session not started")]
    NotStarted,

    /// A conversation already has an exchange in flight.
    #[error("an exchange is already in progress")]
    ExchangeInProgress,

    /// The driver task ended without producing an exchange.
    #[error("session driver failed: {0}")]
    DriverFailed(String),
}

/// Cancels a session from anywhere, e.g. a signal handler.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    /// Requests cancellation. Has no effect once the session is terminal.
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// One streamed exchange over a [`ChatTransport`].
pub struct StreamingChatSession<T> {
    transport: Arc<T>,
    capacity: usize,
    cancel: CancelHandle,
    driver: Option<JoinHandle<ChatExchange>>,
}

impl<T: ChatTransport + 'static> StreamingChatSession<T> {
    /// Creates an idle session.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            transport,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel: CancelHandle(Arc::new(cancel_tx)),
            driver: None,
        }
    }

    /// Sets the snapshot buffer size (minimum 1).
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Sends `message` and starts streaming the reply.
    ///
    /// The returned stream yields a snapshot after every change and ends when
    /// the session is terminal. Dropping it does not stop the session.
    ///
    /// # Errors
    /// Returns `SessionError::AlreadyStarted` on a second call.
    pub fn start(
        &mut self,
        message: impl Into<String>,
        context: ChatContext,
    ) -> Result<SnapshotStream, SessionError> {
        if self.driver.is_some() {
            return Err(SessionError::AlreadyStarted);
        }

        let message = message.into();
        let request = ChatRequest {
            message: message.clone(),
            project_id: context.project_id,
            parent_folder_id: context.parent_folder_id,
            file_ids: context.file_ids,
            conversation_id: context.conversation_id,
        };

        let (tx, rx) = mpsc::channel(self.capacity);
        let driver = Driver {
            state: SessionState::Idle,
            user: ChatMessage::user(message),
            assistant: ChatMessage::assistant(),
            snapshots: Some(tx),
            cancel: self.cancel.0.subscribe(),
        };

        tracing::info!(
            project_id = %request.project_id,
            files = request.file_ids.len(),
            "starting chat exchange"
        );
        self.driver = Some(tokio::spawn(driver.run(Arc::clone(&self.transport), request)));
        Ok(ReceiverStream::new(rx))
    }

    /// Requests cancellation of the running exchange.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel this session after it has been moved.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Waits for the exchange to end and returns its messages.
    ///
    /// Keep draining or drop the snapshot stream first; a full, unread
    /// buffer holds the driver until it is cancelled, after which the final
    /// snapshot may be missing from the stream.
    ///
    /// # Errors
    /// Returns `SessionError::NotStarted` before `start`, or
    /// `SessionError::DriverFailed` if the driver task panicked.
    pub async fn finish(self) -> Result<ChatExchange, SessionError> {
        let driver = self.driver.ok_or(SessionError::NotStarted)?;
        driver
            .await
            .map_err(|e| SessionError::DriverFailed(e.to_string()))
    }
}

/// How a record ended the exchange.
enum Ending {
    Completed,
    Failed(String),
}

/// State owned by the spawned driver task.
struct Driver {
    state: SessionState,
    user: ChatMessage,
    assistant: ChatMessage,
    snapshots: Option<mpsc::Sender<ChatSnapshot>>,
    cancel: watch::Receiver<bool>,
}

impl Driver {
    async fn run<T: ChatTransport>(mut self, transport: Arc<T>, request: ChatRequest) -> ChatExchange {
        self.transition(SessionState::Sending).await;

        let opened = tokio::select! {
            biased;
            () = cancelled(&mut self.cancel) => None,
            result = transport.open(&request) => Some(result),
        };
        let mut body = match opened {
            None => return self.end(SessionState::Cancelled).await,
            Some(Err(e)) => return self.fail(e.to_string()).await,
            Some(Ok(body)) => body,
        };

        self.transition(SessionState::Streaming).await;
        let mut decoder = FrameDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                () = cancelled(&mut self.cancel) => {
                    drop(body);
                    tracing::info!("chat exchange cancelled");
                    return self.end(SessionState::Cancelled).await;
                }
                next = body.next() => next,
            };

            let records = match next {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(e)) => return self.fail(e.to_string()).await,
                None => {
                    let mut tail = decoder.finish();
                    tail.push(Record::Terminator);
                    tail
                }
            };

            for record in records {
                match self.apply(record).await {
                    Some(Ending::Completed) => return self.end(SessionState::Completed).await,
                    Some(Ending::Failed(detail)) => return self.fail(detail).await,
                    None => {}
                }
            }
        }
    }

    /// Applies one record; returns how the exchange ends if it does.
    async fn apply(&mut self, record: Record) -> Option<Ending> {
        match record {
            Record::Terminator | Record::Frame(StreamFrame::Done) => Some(Ending::Completed),
            Record::Frame(StreamFrame::Error { message }) => Some(Ending::Failed(message)),
            Record::Malformed { payload, error } => {
                tracing::warn!(%error, payload = %truncate(&payload, 200), "skipping malformed stream frame");
                None
            }
            Record::Frame(StreamFrame::Content { text }) => {
                self.assistant.append_text(&text);
                self.publish().await;
                None
            }
            Record::Frame(StreamFrame::Reasoning {
                text,
                title,
                action,
                confidence,
            }) => {
                self.assistant
                    .push_reasoning(ReasoningPart::from_frame(&text, title, action, confidence));
                self.publish().await;
                None
            }
            Record::Frame(StreamFrame::ToolCall {
                tool_call_id,
                tool_name,
                args,
                state,
                result,
            }) => {
                let update = ToolCallUpdate {
                    tool_call_id,
                    tool_name,
                    args,
                    state,
                    result,
                };
                let name = update.tool_name.clone();
                if self.assistant.apply_tool_call(update) {
                    self.publish().await;
                } else {
                    tracing::warn!(tool = %name, ?state, "ignoring backwards tool-call transition");
                }
                None
            }
        }
    }

    async fn transition(&mut self, state: SessionState) {
        self.state = state;
        self.publish().await;
    }

    async fn fail(mut self, detail: String) -> ChatExchange {
        tracing::warn!(error = %detail, "chat exchange failed");
        self.assistant.mark_failed(detail);
        self.end(SessionState::Errored).await
    }

    async fn end(mut self, state: SessionState) -> ChatExchange {
        self.transition(state).await;
        tracing::debug!(?state, parts = self.assistant.parts.len(), "chat exchange ended");
        ChatExchange {
            state,
            user: self.user,
            assistant: self.assistant,
        }
    }

    /// Sends a snapshot, waiting for buffer space unless cancelled meanwhile.
    /// Once cancelled, a terminal snapshot is only offered to a buffer with
    /// room and other snapshots are skipped.
    async fn publish(&mut self) {
        let Some(tx) = &self.snapshots else {
            return;
        };
        let snapshot = ChatSnapshot {
            state: self.state,
            message: self.assistant.clone(),
        };

        let delivered = if self.state == SessionState::Cancelled {
            offer(tx, snapshot)
        } else {
            let last = self.state.is_terminal().then(|| snapshot.clone());
            tokio::select! {
                biased;
                () = cancelled(&mut self.cancel) => match last {
                    Some(last) => offer(tx, last),
                    None => true,
                },
                sent = tx.send(snapshot) => sent.is_ok(),
            }
        };
        if !delivered {
            tracing::debug!("snapshot receiver dropped, continuing without subscribers");
            self.snapshots = None;
        }
    }
}

/// Queues a snapshot without waiting; `false` only if the receiver is gone.
fn offer(tx: &mpsc::Sender<ChatSnapshot>, snapshot: ChatSnapshot) -> bool {
    !matches!(tx.try_send(snapshot), Err(mpsc::error::TrySendError::Closed(_)))
}

/// Resolves once cancellation has been requested; never resolves if the
/// session handle is dropped without cancelling.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}

/// Finalized messages of one conversation, in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    #[serde(skip)]
    active: bool,
}

impl Conversation {
    /// An empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an exchange as in flight.
    ///
    /// # Errors
    /// Returns `SessionError::ExchangeInProgress` if one already is.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.active {
            return Err(SessionError::ExchangeInProgress);
        }
        self.active = true;
        Ok(())
    }

    /// Whether an exchange is in flight.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Records both messages of a finished exchange, whatever its outcome.
    pub fn record(&mut self, exchange: ChatExchange) {
        self.messages.push(exchange.user);
        self.messages.push(exchange.assistant);
        self.active = false;
    }

    /// Ends an in-flight exchange that produced nothing to record.
    pub fn abandon(&mut self) {
        self.active = false;
    }

    /// All recorded messages.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!SessionState::Sending.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(SessionState::Errored.is_terminal());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn conversation_refuses_overlapping_exchanges() {
        let mut conversation = Conversation::new();
        conversation.begin().unwrap();
        assert!(matches!(conversation.begin(), Err(SessionError::ExchangeInProgress)));

        let mut assistant = ChatMessage::assistant();
        assistant.mark_failed("boom");
        conversation.record(ChatExchange {
            state: SessionState::Errored,
            user: ChatMessage::user("hi"),
            assistant,
        });

        assert!(!conversation.is_active());
        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation.begin().is_ok());
    }
}

//! Stream Engine
//!
//! Runs one conversation request at a time. The request itself executes on a
//! spawned task that reports back through a bounded channel; the engine
//! folds those signals into the pending buffer and tells its owner what
//! happened.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::pending::{CompletedStream, PendingStream};
use crate::backend::{BackendError, ConversationBackend, ConversationRequest, TimeoutPhase};
use crate::config::ClientConfig;
use crate::messages::{ConductorState, MessageId};
use crate::session::SessionId;

/// Errors from the stream engine
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A request is already in flight
    #[error("a response is still in progress")]
    Busy,
}

/// Bounded waits applied by the request task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamTimeouts {
    /// Bound for response headers, and separately for the first chunk
    pub first_byte: Duration,
    /// Bound for each gap between chunks
    pub inter_chunk: Duration,
}

impl Default for StreamTimeouts {
    fn default() -> Self {
        Self {
            first_byte: Duration::from_secs(30),
            inter_chunk: Duration::from_secs(30),
        }
    }
}

impl From<&ClientConfig> for StreamTimeouts {
    fn from(config: &ClientConfig) -> Self {
        Self {
            first_byte: config.first_byte_timeout,
            inter_chunk: config.inter_chunk_timeout,
        }
    }
}

/// Report from the request task
#[derive(Debug)]
pub enum StreamSignal {
    /// Response headers arrived with a success status
    Opened,
    /// A body chunk, in arrival order
    Chunk(Bytes),
    /// The server closed the body
    Finished,
    /// The request or the body failed
    Failed(BackendError),
}

/// What the engine's owner needs to act on
#[derive(Debug)]
pub enum EngineEvent {
    /// The response started
    Opened {
        /// Message ID reserved for the response
        message_id: MessageId,
    },
    /// Newly decoded text for the live view
    Text {
        /// Message ID of the response
        message_id: MessageId,
        /// Decoded text
        text: String,
    },
    /// The response ended normally
    Completed(CompletedStream),
    /// The response failed; nothing may be committed
    Failed {
        /// Message ID of the response
        message_id: MessageId,
        /// Cause
        error: BackendError,
        /// Text that had been shown before the failure
        partial: String,
    },
}

/// Aborts the request task when dropped
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The request currently in flight
#[derive(Debug)]
struct InFlight {
    pending: PendingStream,
    rx: mpsc::Receiver<StreamSignal>,
    _task: AbortOnDrop,
}

/// Single-flight streaming request engine
pub struct StreamEngine<B: ConversationBackend + ?Sized + 'static> {
    backend: Arc<B>,
    timeouts: StreamTimeouts,
    channel_capacity: usize,
    state: ConductorState,
    inflight: Option<InFlight>,
}

impl<B: ConversationBackend + ?Sized + 'static> StreamEngine<B> {
    /// Create an idle engine
    pub fn new(backend: Arc<B>, timeouts: StreamTimeouts, channel_capacity: usize) -> Self {
        Self {
            backend,
            timeouts,
            channel_capacity: channel_capacity.max(1),
            state: ConductorState::Idle,
            inflight: None,
        }
    }

    /// Current engine state
    ///
    /// One of `Idle`, `Sending`, `Streaming`, `Finalizing` or `Error`.
    #[must_use]
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Whether a new request may start
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == ConductorState::Idle
    }

    /// The in-flight buffer, if any
    #[must_use]
    pub fn pending(&self) -> Option<&PendingStream> {
        self.inflight.as_ref().map(|f| &f.pending)
    }

    /// Issue a request
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(
        &mut self,
        session_id: &SessionId,
        message: String,
    ) -> Result<MessageId, EngineError> {
        if !self.is_idle() || self.inflight.is_some() {
            return Err(EngineError::Busy);
        }

        let message_id = MessageId::new();
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let task = tokio::spawn(run_request(
            Arc::clone(&self.backend),
            session_id.clone(),
            ConversationRequest::new(message),
            self.timeouts,
            tx,
        ));

        self.inflight = Some(InFlight {
            pending: PendingStream::new(message_id.clone()),
            rx,
            _task: AbortOnDrop(task),
        });
        self.state = ConductorState::Sending;

        tracing::debug!(message_id = %message_id, session_id = %session_id, "Request issued");
        Ok(message_id)
    }

    /// Take a signal without waiting
    pub fn try_next_signal(&mut self) -> Option<StreamSignal> {
        let inflight = self.inflight.as_mut()?;
        match inflight.rx.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(task_vanished()),
        }
    }

    /// Wait for the next signal; `None` if nothing is in flight
    pub async fn next_signal(&mut self) -> Option<StreamSignal> {
        let inflight = self.inflight.as_mut()?;
        Some(inflight.rx.recv().await.unwrap_or_else(task_vanished))
    }

    /// Fold a signal into the engine
    pub fn apply(&mut self, signal: StreamSignal) -> Option<EngineEvent> {
        let Some(inflight) = self.inflight.as_mut() else {
            tracing::debug!(signal = ?signal, "Dropping signal with no request in flight");
            return None;
        };

        match signal {
            StreamSignal::Opened => {
                self.state = ConductorState::Streaming;
                Some(EngineEvent::Opened {
                    message_id: inflight.pending.message_id().clone(),
                })
            }

            StreamSignal::Chunk(bytes) => {
                self.state = ConductorState::Streaming;
                let text = inflight.pending.push(&bytes);
                if text.is_empty() {
                    return None;
                }
                Some(EngineEvent::Text {
                    message_id: inflight.pending.message_id().clone(),
                    text,
                })
            }

            StreamSignal::Finished => {
                let inflight = self.inflight.take()?;
                self.state = ConductorState::Finalizing;
                let completed = inflight.pending.finish();
                tracing::debug!(
                    message_id = %completed.message_id,
                    bytes = completed.byte_count,
                    chunks = completed.chunk_count,
                    elapsed_ms = completed.elapsed.as_millis() as u64,
                    "Stream finished"
                );
                Some(EngineEvent::Completed(completed))
            }

            StreamSignal::Failed(error) => {
                let inflight = self.inflight.take()?;
                self.state = ConductorState::Error;
                Some(EngineEvent::Failed {
                    message_id: inflight.pending.message_id().clone(),
                    partial: inflight.pending.partial_text().to_string(),
                    error,
                })
            }
        }
    }

    /// Abort the in-flight request
    ///
    /// Dropping the task drops the response body, which releases the
    /// connection. Returns the ID of the aborted response.
    pub fn cancel(&mut self) -> Option<MessageId> {
        let inflight = self.inflight.take()?;
        let message_id = inflight.pending.message_id().clone();
        drop(inflight);
        self.state = ConductorState::Idle;
        tracing::info!(message_id = %message_id, "Request cancelled");
        Some(message_id)
    }

    /// Return to Idle after a completed or failed response was handled
    pub fn settle(&mut self) {
        if matches!(self.state, ConductorState::Finalizing | ConductorState::Error) {
            self.state = ConductorState::Idle;
        }
    }
}

fn task_vanished() -> StreamSignal {
    StreamSignal::Failed(BackendError::Transport(
        "request task ended without a result".to_string(),
    ))
}

/// Request task body: report the outcome, then exit
async fn run_request<B>(
    backend: Arc<B>,
    session_id: SessionId,
    request: ConversationRequest,
    timeouts: StreamTimeouts,
    tx: mpsc::Sender<StreamSignal>,
) where
    B: ConversationBackend + ?Sized,
{
    let signal = match stream_response(&*backend, &session_id, &request, timeouts, &tx).await {
        Ok(()) => StreamSignal::Finished,
        Err(error) => StreamSignal::Failed(error),
    };
    // Receiver gone means the request was cancelled
    let _ = tx.send(signal).await;
}

async fn stream_response<B>(
    backend: &B,
    session_id: &SessionId,
    request: &ConversationRequest,
    timeouts: StreamTimeouts,
    tx: &mpsc::Sender<StreamSignal>,
) -> Result<(), BackendError>
where
    B: ConversationBackend + ?Sized,
{
    let mut body = timeout(
        timeouts.first_byte,
        backend.open_conversation(session_id, request),
    )
    .await
    .map_err(|_| BackendError::Timeout {
        phase: TimeoutPhase::Headers,
        after: timeouts.first_byte,
    })??;

    if tx.send(StreamSignal::Opened).await.is_err() {
        return Ok(());
    }

    let mut phase = TimeoutPhase::FirstChunk;
    let mut wait = timeouts.first_byte;

    loop {
        let next = timeout(wait, body.next())
            .await
            .map_err(|_| BackendError::Timeout { phase, after: wait })?;

        let Some(chunk) = next else {
            return Ok(());
        };
        let chunk = chunk?;

        if tx.send(StreamSignal::Chunk(chunk)).await.is_err() {
            return Ok(());
        }
        phase = TimeoutPhase::BetweenChunks;
        wait = timeouts.inter_chunk;
    }
}

//! Shared test infrastructure: a scripted in-memory backend and helpers for
//! driving a Conductor without a real service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use coursechat_core::{
    BackendError, ChunkStream, ClientConfig, Conductor, ConversationBackend, ConversationRequest,
    Course, FieldValue, SessionId,
};

// =============================================================================
// Scripted Backend
// =============================================================================

/// How the backend answers one conversation request
pub enum Script {
    /// Send these chunks, then close the body
    Chunks(Vec<Bytes>),
    /// Send these chunks, then break off with a transport error
    FailAfter(Vec<Bytes>, String),
    /// Answer with a non-success status
    Refuse(u16),
    /// Chunks come from the test, the body closes when the sender is dropped
    Controlled(mpsc::Receiver<Result<Bytes, BackendError>>),
    /// Send these chunks, then go silent forever
    Stall(Vec<Bytes>),
}

/// In-memory backend that replays one script per request
pub struct ScriptedBackend {
    courses: Option<Vec<Course>>,
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<(SessionId, ConversationRequest)>>,
    course_fetches: AtomicUsize,
}

impl ScriptedBackend {
    /// Backend serving `courses`
    pub fn new(courses: Vec<Course>) -> Self {
        Self {
            courses: Some(courses),
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            course_fetches: AtomicUsize::new(0),
        }
    }

    /// Backend whose catalogue endpoint fails
    pub fn without_courses() -> Self {
        Self {
            courses: None,
            ..Self::new(Vec::new())
        }
    }

    /// Queue the answer for the next request
    pub fn push_script(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    /// Messages received so far, in order
    pub fn sent_messages(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|(_, request)| request.message.clone())
            .collect()
    }

    /// Sessions used so far, in order
    pub fn sent_sessions(&self) -> Vec<SessionId> {
        self.requests
            .lock()
            .iter()
            .map(|(session, _)| session.clone())
            .collect()
    }

    /// Number of catalogue fetches
    pub fn course_fetches(&self) -> usize {
        self.course_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError> {
        self.course_fetches.fetch_add(1, Ordering::SeqCst);
        self.courses
            .clone()
            .ok_or_else(|| BackendError::Decode("expected a JSON array".to_string()))
    }

    async fn open_conversation(
        &self,
        session_id: &SessionId,
        request: &ConversationRequest,
    ) -> Result<ChunkStream, BackendError> {
        self.requests
            .lock()
            .push((session_id.clone(), request.clone()));

        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| BackendError::Connect("connection refused".to_string()))?;

        match script {
            Script::Chunks(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok)).boxed()),
            Script::FailAfter(chunks, reason) => {
                let tail = stream::once(async move { Err(BackendError::Transport(reason)) });
                Ok(stream::iter(chunks.into_iter().map(Ok)).chain(tail).boxed())
            }
            Script::Refuse(status) => Err(BackendError::Status {
                status,
                body: String::new(),
            }),
            Script::Controlled(rx) => Ok(ReceiverStream::new(rx).boxed()),
            Script::Stall(chunks) => Ok(stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// A course with text fields
pub fn course(name: &str, course_id: &str, credits: &str) -> Course {
    Course {
        name: name.to_string(),
        course_id: FieldValue::Text(course_id.to_string()),
        credits: FieldValue::Text(credits.to_string()),
    }
}

/// A small catalogue in backend order
pub fn sample_courses() -> Vec<Course> {
    vec![
        course("Operating Systems", "CS-301", "5"),
        course("Algorithms", "CS-201", "10"),
        course("Databases", "CS-150", "7"),
    ]
}

/// Split a string into byte chunks at the given offsets
pub fn chunks_at(text: &str, offsets: &[usize]) -> Vec<Bytes> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    for &end in offsets {
        chunks.push(Bytes::copy_from_slice(&bytes[start..end]));
        start = end;
    }
    chunks.push(Bytes::copy_from_slice(&bytes[start..]));
    chunks
}

/// A Conductor over `backend` with a fresh session
pub fn conductor_with(
    backend: ScriptedBackend,
    config: ClientConfig,
) -> (
    Conductor<ScriptedBackend>,
    mpsc::Receiver<coursechat_core::ConductorMessage>,
) {
    let (tx, rx) = mpsc::channel(1024);
    let conductor = Conductor::with_session(backend, config, SessionId::generate(), tx);
    (conductor, rx)
}

/// Everything the Conductor has sent so far
pub fn drain(
    rx: &mut mpsc::Receiver<coursechat_core::ConductorMessage>,
) -> Vec<coursechat_core::ConductorMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

//! Conductor - The Orchestration Core
//!
//! The Conductor ties the pieces of a course chat together:
//! - the course catalogue and its sort filters
//! - input framing (default prompt vs. free text)
//! - the single-flight streaming engine
//! - the append-only transcript
//! - communication with UI surfaces
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know whether it is talking to a
//! terminal, a browser bridge or a test harness. It communicates through:
//! - `ConductorMessage`: Commands sent TO the UI surface
//! - `SurfaceEvent`: Events received FROM the UI surface
//!
//! All state changes happen inside `&mut self` methods, so a surface never
//! observes a half-applied transition.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::backend::ConversationBackend;
use crate::catalogue::{Catalogue, Course, SortKey};
use crate::config::ClientConfig;
use crate::events::{SurfaceEvent, SurfaceType};
use crate::input::{InputController, InputRejection};
use crate::messages::{
    ConductorMessage, ConductorState, ContentType, EventId, LayoutDirective, MessageRole,
    NotifyLevel,
};
use crate::render::{MarkdownRenderer, RichTextRenderer};
use crate::session::SessionId;
use crate::streaming::{EngineEvent, StreamEngine, StreamSignal, StreamTimeouts};
use crate::transcript::{ScrollAnchor, ScrollBehavior, Transcript};

/// The Conductor - headless orchestration core
pub struct Conductor<B: ConversationBackend + 'static> {
    /// Configuration
    config: ClientConfig,
    /// Conversation backend
    backend: Arc<B>,
    /// Session every request is scoped by
    session_id: SessionId,
    /// Course list and sort filters
    catalogue: Catalogue,
    /// Committed entries
    transcript: Transcript,
    /// Outbound message framing
    input: InputController,
    /// Request engine
    engine: StreamEngine<B>,
    /// Markdown + math renderer for completed responses
    renderer: Box<dyn RichTextRenderer>,
    /// Current operational state
    state: ConductorState,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
    /// Connected surface info
    surface_type: Option<SurfaceType>,
    /// Input availability last reported to the surface
    input_enabled: Option<bool>,
}

impl<B: ConversationBackend + 'static> Conductor<B> {
    /// Create a new Conductor for the process-wide session
    pub fn new(backend: B, config: ClientConfig, tx: mpsc::Sender<ConductorMessage>) -> Self {
        Self::with_session(backend, config, SessionId::current(), tx)
    }

    /// Create a new Conductor for an explicit session
    pub fn with_session(
        backend: B,
        config: ClientConfig,
        session_id: SessionId,
        tx: mpsc::Sender<ConductorMessage>,
    ) -> Self {
        let backend = Arc::new(backend);
        let engine = StreamEngine::new(
            Arc::clone(&backend),
            StreamTimeouts::from(&config),
            config.channel_capacity,
        );
        let input = InputController::new(config.max_message_bytes);

        Self {
            config,
            backend,
            session_id,
            catalogue: Catalogue::new(),
            transcript: Transcript::new(),
            input,
            engine,
            renderer: Box::new(MarkdownRenderer::new()),
            state: ConductorState::Initializing,
            tx,
            surface_type: None,
            input_enabled: None,
        }
    }

    /// Replace the rich-text renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl RichTextRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Get current state
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Get the catalogue
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Get the input controller
    pub fn input(&self) -> &InputController {
        &self.input
    }

    /// Text of the in-flight response, if any
    pub fn pending_text(&self) -> Option<&str> {
        self.engine.pending().map(|p| p.partial_text())
    }

    /// Start the Conductor: load the catalogue and announce the session
    ///
    /// Fails if the catalogue cannot be loaded; the client has nothing to
    /// offer without it.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.set_state(ConductorState::Initializing).await;

        if let Err(e) = self.catalogue.ensure_loaded(self.backend.as_ref()).await {
            tracing::error!(error = %e, backend = self.backend.name(), "Course catalogue unavailable");
            self.notify(NotifyLevel::Error, &format!("Error: {e}")).await;
            return Err(e).context("failed to load the course catalogue");
        }

        self.send_catalogue().await;
        self.send(ConductorMessage::SessionInfo {
            session_id: self.session_id.clone(),
            base_url: self.config.base_url.clone(),
        })
        .await;

        self.set_state(ConductorState::Idle).await;
        self.sync_input().await;

        tracing::info!(session_id = %self.session_id, "Conductor started");
        Ok(())
    }

    /// Handle an event from the UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::Connected {
                event_id,
                surface_type,
            } => {
                tracing::debug!(surface = surface_type.name(), "Surface connected");
                self.surface_type = Some(surface_type);
                self.ack(event_id).await;

                // Bring the new surface up to date
                self.send(ConductorMessage::State { state: self.state })
                    .await;
                // start() announces the session itself
                if self.state != ConductorState::Initializing {
                    self.send(ConductorMessage::SessionInfo {
                        session_id: self.session_id.clone(),
                        base_url: self.config.base_url.clone(),
                    })
                    .await;
                }
                if self.catalogue.is_loaded() {
                    self.send_catalogue().await;
                }
                self.input_enabled = None;
                self.sync_input().await;
            }

            SurfaceEvent::Disconnected { event_id, reason } => {
                tracing::debug!(reason = ?reason, "Surface disconnected");
                self.surface_type = None;
                self.ack(event_id).await;
            }

            SurfaceEvent::CourseSelected { event_id, course } => {
                self.ack(event_id).await;
                self.handle_course_selected(course).await;
            }

            SurfaceEvent::SortToggled { event_id, key } => {
                self.ack(event_id).await;
                self.handle_sort_toggled(key).await;
            }

            SurfaceEvent::TextSubmitted {
                event_id,
                content,
                trigger,
            } => {
                self.ack(event_id).await;
                tracing::trace!(trigger = ?trigger, "Text submitted");
                self.handle_text_submitted(content).await;
            }

            SurfaceEvent::CancelRequested { event_id } => {
                self.ack(event_id).await;
                self.cancel().await;
            }

            SurfaceEvent::QuitRequested { event_id } => {
                self.ack(event_id).await;
                self.shutdown().await?;
            }
        }

        Ok(())
    }

    /// Ask about a course with the default prompt
    async fn handle_course_selected(&mut self, course: Course) {
        if let Err(rejection) = self.check_ready() {
            self.reject(rejection).await;
            return;
        }

        let message = self.input.select_course(&course);
        tracing::debug!(course = %course.name, course_id = %course.course_id, "Course selected");

        self.send(ConductorMessage::LayoutHint {
            directive: LayoutDirective::FocusChat,
        })
        .await;
        self.begin_request(message).await;
    }

    /// Send free text verbatim
    async fn handle_text_submitted(&mut self, content: String) {
        if content.trim().is_empty() {
            tracing::debug!("Ignoring empty submission");
            return;
        }
        if let Err(rejection) = self.check_ready() {
            self.reject(rejection).await;
            return;
        }

        let text = match self.input.submit(&content) {
            Ok(text) => text,
            Err(rejection) => {
                self.reject(rejection).await;
                return;
            }
        };

        // The question shows up before the answer starts
        let entry = self.transcript.append(MessageRole::User, text.clone());
        let id = entry.id().clone();
        self.send(ConductorMessage::Message {
            id: id.clone(),
            role: MessageRole::User,
            content: text.clone(),
            content_type: ContentType::Plain,
        })
        .await;
        self.send(ConductorMessage::LayoutHint {
            directive: LayoutDirective::ScrollTo {
                message_id: id,
                anchor: ScrollAnchor::for_role(MessageRole::User),
                behavior: ScrollBehavior::Smooth,
            },
        })
        .await;
        self.send(ConductorMessage::LayoutHint {
            directive: LayoutDirective::ClearInput,
        })
        .await;

        self.begin_request(text).await;
    }

    /// Flip a sort filter and publish the new order
    async fn handle_sort_toggled(&mut self, key: SortKey) {
        match self.catalogue.toggle(key) {
            Ok(courses) => {
                let sort = self.catalogue.sort_state();
                tracing::debug!(key = ?key, sort = ?sort, "Sort toggled");
                self.send(ConductorMessage::Catalogue { courses, sort }).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sort requested before catalogue loaded");
                self.notify(NotifyLevel::Error, &e.to_string()).await;
            }
        }
    }

    fn check_ready(&self) -> Result<(), InputRejection> {
        if self.engine.is_idle() && self.state == ConductorState::Idle {
            Ok(())
        } else {
            Err(InputRejection::Busy)
        }
    }

    async fn reject(&self, rejection: InputRejection) {
        tracing::warn!(reason = %rejection, state = ?self.state, "Rejected input");
        self.notify(NotifyLevel::Warning, &rejection.to_string())
            .await;
    }

    async fn begin_request(&mut self, message: String) {
        match self.engine.begin(&self.session_id, message) {
            Ok(message_id) => {
                tracing::info!(message_id = %message_id, "Conversation request started");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request refused");
                self.notify(NotifyLevel::Warning, &e.to_string()).await;
            }
        }
        self.sync_state().await;
    }

    /// Process every signal that is ready, without waiting
    ///
    /// Returns true if there was activity.
    pub async fn poll_streaming(&mut self) -> bool {
        let mut active = false;
        while let Some(signal) = self.engine.try_next_signal() {
            self.process_signal(signal).await;
            active = true;
        }
        active
    }

    /// Wait for the next signal from the in-flight request
    ///
    /// Returns `None` immediately when nothing is in flight. Cancel-safe, so
    /// it can sit in a `tokio::select!` next to surface input.
    pub async fn next_signal(&mut self) -> Option<StreamSignal> {
        self.engine.next_signal().await
    }

    /// Drive the in-flight request to completion, failure or timeout
    pub async fn run_until_idle(&mut self) {
        while let Some(signal) = self.engine.next_signal().await {
            self.process_signal(signal).await;
        }
    }

    /// Apply one signal from the request task
    pub async fn process_signal(&mut self, signal: StreamSignal) {
        let Some(event) = self.engine.apply(signal) else {
            self.sync_state().await;
            return;
        };

        match event {
            EngineEvent::Opened { message_id } => {
                self.sync_state().await;
                self.send(ConductorMessage::StreamStarted { message_id })
                    .await;
            }

            EngineEvent::Text { message_id, text } => {
                self.send(ConductorMessage::Token { message_id, text })
                    .await;
            }

            EngineEvent::Completed(done) => {
                self.sync_state().await;
                self.send(ConductorMessage::StreamEnd {
                    message_id: done.message_id.clone(),
                })
                .await;

                let html = self.renderer.render(&done.text);
                let entry = self.transcript.append_with_id(
                    done.message_id.clone(),
                    MessageRole::Assistant,
                    html.clone(),
                );
                let id = entry.id().clone();

                self.send(ConductorMessage::Message {
                    id: id.clone(),
                    role: MessageRole::Assistant,
                    content: html,
                    content_type: ContentType::Html,
                })
                .await;
                self.send(ConductorMessage::LayoutHint {
                    directive: LayoutDirective::ScrollTo {
                        message_id: id,
                        anchor: ScrollAnchor::for_role(MessageRole::Assistant),
                        behavior: ScrollBehavior::Smooth,
                    },
                })
                .await;

                tracing::info!(
                    message_id = %done.message_id,
                    bytes = done.byte_count,
                    chunks = done.chunk_count,
                    elapsed_ms = done.elapsed.as_millis() as u64,
                    "Response committed"
                );
                self.engine.settle();
            }

            EngineEvent::Failed {
                message_id,
                error,
                partial,
            } => {
                tracing::error!(
                    message_id = %message_id,
                    error = %error,
                    partial_bytes = partial.len(),
                    "Conversation request failed"
                );
                self.sync_state().await;
                self.send(ConductorMessage::StreamError {
                    message_id,
                    error: error.to_string(),
                })
                .await;
                self.notify(NotifyLevel::Error, &format!("Error: {error}"))
                    .await;
                self.engine.settle();
            }
        }

        self.sync_state().await;
    }

    /// Abort the in-flight request, committing nothing
    pub async fn cancel(&mut self) {
        match self.engine.cancel() {
            Some(message_id) => {
                self.send(ConductorMessage::StreamCancelled { message_id })
                    .await;
                self.notify(NotifyLevel::Info, "Response cancelled").await;
                self.sync_state().await;
            }
            None => tracing::debug!("Nothing to cancel"),
        }
    }

    /// Shut down the Conductor
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(message_id) = self.engine.cancel() {
            self.send(ConductorMessage::StreamCancelled { message_id })
                .await;
        }
        self.set_state(ConductorState::ShuttingDown).await;
        self.sync_input().await;

        self.send(ConductorMessage::Quit {
            message: Some("Goodbye!".to_string()),
        })
        .await;

        tracing::info!(
            session_id = %self.session_id,
            entries = self.transcript.len(),
            "Conductor shut down"
        );
        Ok(())
    }

    /// Mirror the engine state once started
    async fn sync_state(&mut self) {
        if !matches!(
            self.state,
            ConductorState::Initializing | ConductorState::ShuttingDown
        ) {
            let state = self.engine.state();
            if state != self.state {
                self.set_state(state).await;
            }
        }
        self.sync_input().await;
    }

    /// Tell the surface whether free text is accepted, if that changed
    async fn sync_input(&mut self) {
        let enabled = self.input.is_unlocked()
            && self.engine.is_idle()
            && self.state == ConductorState::Idle;
        if self.input_enabled != Some(enabled) {
            self.input_enabled = Some(enabled);
            self.send(ConductorMessage::InputAvailability { enabled })
                .await;
        }
    }

    async fn send_catalogue(&self) {
        match self.catalogue.view() {
            Ok(courses) => {
                self.send(ConductorMessage::Catalogue {
                    courses,
                    sort: self.catalogue.sort_state(),
                })
                .await;
            }
            Err(e) => tracing::warn!(error = %e, "Catalogue not available"),
        }
    }

    /// Set state and notify UI
    async fn set_state(&mut self, state: ConductorState) {
        tracing::debug!(from = ?self.state, to = ?state, "State transition");
        self.state = state;
        self.send(ConductorMessage::State { state }).await;
    }

    /// Send acknowledgment
    async fn ack(&self, event_id: EventId) {
        self.send(ConductorMessage::Ack { event_id }).await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ConductorMessage::Notify {
            level,
            title: None,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, ChunkStream, ConversationRequest};
    use crate::catalogue::FieldValue;
    use bytes::Bytes;
    use futures::{stream, StreamExt};

    // Mock backend for testing
    struct MockBackend;

    #[async_trait::async_trait]
    impl ConversationBackend for MockBackend {
        fn name(&self) -> &str {
            "Mock"
        }

        async fn fetch_courses(&self) -> Result<Vec<Course>, BackendError> {
            Ok(vec![Course {
                name: "Algorithms".to_string(),
                course_id: FieldValue::Text("CS-201".to_string()),
                credits: FieldValue::Text("10".to_string()),
            }])
        }

        async fn open_conversation(
            &self,
            _session_id: &SessionId,
            _request: &ConversationRequest,
        ) -> Result<ChunkStream, BackendError> {
            let chunks = vec![
                Ok(Bytes::from_static(b"Hello ")),
                Ok(Bytes::from_static(b"**world**")),
            ];
            Ok(stream::iter(chunks).boxed())
        }
    }

    fn conductor() -> (Conductor<MockBackend>, mpsc::Receiver<ConductorMessage>) {
        let (tx, rx) = mpsc::channel(100);
        let conductor = Conductor::with_session(
            MockBackend,
            ClientConfig::default(),
            SessionId::generate(),
            tx,
        );
        (conductor, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ConductorMessage>) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn test_conductor_creation() {
        let (conductor, _rx) = conductor();
        assert_eq!(conductor.state(), ConductorState::Initializing);
        assert!(conductor.transcript().is_empty());
        assert!(!conductor.catalogue().is_loaded());
    }

    #[tokio::test]
    async fn test_conductor_start() {
        let (mut conductor, mut rx) = conductor();
        conductor.start().await.unwrap();

        assert_eq!(conductor.state(), ConductorState::Idle);
        assert!(conductor.catalogue().is_loaded());

        let messages = drain(&mut rx);
        assert!(matches!(
            messages.first(),
            Some(ConductorMessage::State {
                state: ConductorState::Initializing
            })
        ));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ConductorMessage::Catalogue { courses, .. } if courses.len() == 1)));
        assert!(messages
            .iter()
            .any(|m| matches!(m, ConductorMessage::InputAvailability { enabled: false })));
    }

    #[tokio::test]
    async fn test_session_info_sent_once_when_surface_connects_first() {
        let (mut conductor, mut rx) = conductor();
        conductor
            .handle_event(SurfaceEvent::Connected {
                event_id: SurfaceEvent::new_event_id(),
                surface_type: SurfaceType::Headless,
            })
            .await
            .unwrap();
        conductor.start().await.unwrap();

        let session_infos = drain(&mut rx)
            .into_iter()
            .filter(|m| matches!(m, ConductorMessage::SessionInfo { .. }))
            .count();
        assert_eq!(session_infos, 1);

        // A reconnect after startup still gets the session announced
        conductor
            .handle_event(SurfaceEvent::Connected {
                event_id: SurfaceEvent::new_event_id(),
                surface_type: SurfaceType::Headless,
            })
            .await
            .unwrap();
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m, ConductorMessage::SessionInfo { .. })));
    }

    #[tokio::test]
    async fn test_course_selection_commits_rendered_reply() {
        let (mut conductor, mut rx) = conductor();
        conductor.start().await.unwrap();
        drain(&mut rx);

        let course = conductor.catalogue().view().unwrap()[0].clone();
        conductor
            .handle_event(SurfaceEvent::CourseSelected {
                event_id: SurfaceEvent::new_event_id(),
                course,
            })
            .await
            .unwrap();
        assert_eq!(conductor.state(), ConductorState::Sending);

        conductor.run_until_idle().await;
        assert_eq!(conductor.state(), ConductorState::Idle);

        let entries = conductor.transcript().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role(), MessageRole::Assistant);
        assert!(entries[0].content().contains("<strong>world</strong>"));

        let messages = drain(&mut rx);
        assert!(messages
            .iter()
            .any(|m| matches!(m, ConductorMessage::InputAvailability { enabled: true })));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (mut conductor, mut rx) = conductor();
        conductor.start().await.unwrap();
        conductor.shutdown().await.unwrap();

        assert_eq!(conductor.state(), ConductorState::ShuttingDown);
        let messages = drain(&mut rx);
        assert!(matches!(
            messages.last(),
            Some(ConductorMessage::Quit { .. })
        ));
    }
}

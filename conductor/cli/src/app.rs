//! Main Application
//!
//! The App drives one terminal session as a thin display client:
//! - reads typed lines and turns them into `SurfaceEvent`s
//! - feeds stream signals from the Conductor back into it
//! - applies every `ConductorMessage` to the `DisplayState` and prints it
//!
//! Closing stdin stops reading input but lets a reply that is already on
//! its way finish before the session ends.

use std::io::Write;

use tokio::sync::mpsc;
use tracing::{debug, info};

use coursechat_core::{
    Conductor, ConductorMessage, ConversationBackend, StreamSignal, SurfaceEvent, SurfaceType,
};

use crate::commands::{parse_line, Command, HELP};
use crate::display::{write_outputs, DisplayState, Output};

const START_HINT: &str = "Pick a course with /learn <n>, /help for more.";

/// What woke the main loop
enum Step {
    Signal(StreamSignal),
    Line(String),
    Interrupt,
    Eof,
}

/// Main application state
pub struct App<B: ConversationBackend + 'static> {
    /// The embedded Conductor
    conductor: Conductor<B>,
    /// Messages coming back from the Conductor
    rx: mpsc::Receiver<ConductorMessage>,
    /// Display state derived from ConductorMessages
    display: DisplayState,
    /// Colour output
    ansi: bool,
}

impl<B: ConversationBackend + 'static> App<B> {
    pub fn new(
        conductor: Conductor<B>,
        rx: mpsc::Receiver<ConductorMessage>,
        display: DisplayState,
        ansi: bool,
    ) -> Self {
        Self {
            conductor,
            rx,
            display,
            ansi,
        }
    }

    /// Connect to the Conductor and load the catalogue
    pub async fn start<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        self.conductor
            .handle_event(SurfaceEvent::Connected {
                event_id: SurfaceEvent::new_event_id(),
                surface_type: SurfaceType::Terminal,
            })
            .await?;
        let started = self.conductor.start().await;
        self.flush(out)?;
        started?;
        write_outputs(out, &[Output::Line(START_HINT.to_string())], false)?;
        Ok(())
    }

    /// Run until the session quits
    ///
    /// `lines` yields typed input; the session ends once it closes and
    /// nothing is in flight.
    pub async fn run<W: Write>(
        &mut self,
        mut lines: mpsc::Receiver<String>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let mut stdin_open = true;

        while !self.display.should_quit() {
            let step = tokio::select! {
                Some(signal) = self.conductor.next_signal() => Step::Signal(signal),
                line = lines.recv(), if stdin_open => line.map_or(Step::Eof, Step::Line),
                _ = tokio::signal::ctrl_c() => Step::Interrupt,
            };

            match step {
                Step::Signal(signal) => self.conductor.process_signal(signal).await,
                Step::Line(line) => self.handle_line(&line, out).await?,
                Step::Interrupt => self.handle_interrupt().await?,
                Step::Eof => {
                    debug!(
                        busy = self.conductor.state().is_busy(),
                        "stdin closed"
                    );
                    stdin_open = false;
                }
            }
            self.flush(out)?;

            if !stdin_open && !self.conductor.state().is_busy() && !self.display.should_quit() {
                self.conductor
                    .handle_event(SurfaceEvent::QuitRequested {
                        event_id: SurfaceEvent::new_event_id(),
                    })
                    .await?;
                self.flush(out)?;
            }
        }

        info!("Client stopped");
        Ok(())
    }

    async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<()> {
        let outputs = match parse_line(line, self.display.courses()) {
            Ok(Command::Event(event)) => {
                self.conductor.handle_event(event).await?;
                return Ok(());
            }
            Ok(Command::ListCourses) => self.display.course_list(),
            Ok(Command::History) => self.display.history(),
            Ok(Command::Help) => vec![Output::Line(HELP.to_string())],
            Err(e) => vec![Output::Line(e.to_string())],
        };
        write_outputs(out, &outputs, false)?;
        Ok(())
    }

    /// Ctrl-C cancels the reply in progress, or quits when idle
    async fn handle_interrupt(&mut self) -> anyhow::Result<()> {
        let event_id = SurfaceEvent::new_event_id();
        let event = if self.display.is_streaming() || self.display.state().is_busy() {
            SurfaceEvent::CancelRequested { event_id }
        } else {
            SurfaceEvent::QuitRequested { event_id }
        };
        self.conductor.handle_event(event).await
    }

    /// Apply every queued conductor message to the display
    fn flush<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        while let Ok(msg) = self.rx.try_recv() {
            let outputs = self.display.apply_message(&msg);
            write_outputs(out, &outputs, self.ansi)?;
        }
        out.flush()
    }
}

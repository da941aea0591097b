//! Display State Types
//!
//! Terminal-side state derived from `ConductorMessage`s, and the output it
//! produces.
//!
//! # Design Philosophy
//!
//! The terminal is a thin client: it prints what the Conductor tells it to.
//! `DisplayState::apply_message` turns each message into [`Output`] items and
//! keeps just enough state to do so (the transient streaming view, the
//! committed entries, the course list and the scroll position).

use std::io::{self, Write};

use coursechat_core::{
    scroll_offset, ConductorMessage, ConductorState, ContentType, Course, LayoutDirective,
    MessageId, MessageRole, NotifyLevel, SortState,
};

/// One piece of terminal output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// A full line
    Line(String),
    /// Text without a trailing newline (streamed tokens)
    Inline(String),
    /// Erase the last `n` terminal rows, ending at the cursor
    ClearRows(usize),
}

/// A committed transcript entry as shown in the terminal
#[derive(Clone, Debug)]
pub struct DisplayMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Terminal text
    pub content: String,
}

/// The transient view of the response being streamed
#[derive(Clone, Debug)]
struct StreamingView {
    id: MessageId,
    text: String,
}

const ASSISTANT_PREFIX: &str = "Assistant: ";
const USER_PREFIX: &str = "You: ";

/// Everything the terminal needs to render
#[derive(Debug)]
pub struct DisplayState {
    width: usize,
    show_html: bool,
    messages: Vec<DisplayMessage>,
    streaming: Option<StreamingView>,
    courses: Vec<Course>,
    sort: SortState,
    state: ConductorState,
    input_enabled: bool,
    scroll_top: usize,
    quit: bool,
}

impl DisplayState {
    /// Create an empty display `width` columns wide
    pub fn new(width: usize, show_html: bool) -> Self {
        Self {
            width: width.max(20),
            show_html,
            messages: Vec::new(),
            streaming: None,
            courses: Vec::new(),
            sort: SortState::default(),
            state: ConductorState::Initializing,
            input_enabled: false,
            scroll_top: 0,
            quit: false,
        }
    }

    /// Courses in the order last published
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Last reported Conductor state
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Whether a response is being streamed
    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Whether the Conductor asked the surface to quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Apply a conductor message, returning what to print
    pub fn apply_message(&mut self, msg: &ConductorMessage) -> Vec<Output> {
        match msg {
            ConductorMessage::Message {
                id,
                role,
                content,
                content_type,
            } => {
                let text = match content_type {
                    ContentType::Html if !self.show_html => html_to_text(content),
                    _ => content.clone(),
                };
                self.messages.push(DisplayMessage {
                    id: id.clone(),
                    role: *role,
                    content: text,
                });
                match role {
                    // Typed lines are already on screen
                    MessageRole::User => Vec::new(),
                    MessageRole::Assistant => {
                        let mut out = vec![Output::Line(ASSISTANT_PREFIX.trim_end().to_string())];
                        if let Some(entry) = self.messages.last() {
                            out.extend(self.wrap(&entry.content).into_iter().map(Output::Line));
                        }
                        out.push(Output::Line(String::new()));
                        out
                    }
                }
            }

            ConductorMessage::StreamStarted { message_id } => {
                self.streaming = Some(StreamingView {
                    id: message_id.clone(),
                    text: String::new(),
                });
                vec![Output::Inline(ASSISTANT_PREFIX.to_string())]
            }

            ConductorMessage::Token { message_id, text } => match self.streaming.as_mut() {
                Some(view) if &view.id == message_id => {
                    view.text.push_str(text);
                    vec![Output::Inline(text.clone())]
                }
                _ => Vec::new(),
            },

            ConductorMessage::StreamEnd { message_id } => match self.take_stream(message_id) {
                Some(view) => vec![Output::ClearRows(self.rows_used(&view.text))],
                None => Vec::new(),
            },

            ConductorMessage::StreamError { message_id, .. } => {
                match self.take_stream(message_id) {
                    Some(_) => vec![Output::Line(String::new())],
                    None => Vec::new(),
                }
            }

            ConductorMessage::StreamCancelled { message_id } => {
                match self.take_stream(message_id) {
                    Some(_) => vec![Output::Line(" [cancelled]".to_string())],
                    None => Vec::new(),
                }
            }

            ConductorMessage::Catalogue { courses, sort } => {
                self.courses = courses.clone();
                self.sort = *sort;
                self.course_list()
            }

            ConductorMessage::LayoutHint { directive } => {
                if let LayoutDirective::ScrollTo {
                    message_id, anchor, ..
                } = directive
                {
                    let rows = self.transcript_lines();
                    let entry_rows = self
                        .messages
                        .iter()
                        .find(|m| &m.id == message_id)
                        .map_or(0, |m| self.entry_lines(m).len());
                    let top = scroll_offset(*anchor, to_u32(rows.len()), to_u32(entry_rows));
                    self.scroll_top = top as usize;
                }
                Vec::new()
            }

            ConductorMessage::InputAvailability { enabled } => {
                let first_unlock = *enabled && !self.input_enabled && self.messages.is_empty();
                self.input_enabled = *enabled;
                if first_unlock {
                    vec![Output::Line(
                        "Type a question about the course, or /learn another one.".to_string(),
                    )]
                } else {
                    Vec::new()
                }
            }

            ConductorMessage::Notify {
                level,
                title,
                message,
            } => {
                let tag = match level {
                    NotifyLevel::Info => "info",
                    NotifyLevel::Warning => "warning",
                    NotifyLevel::Error => "error",
                };
                let text = match title {
                    Some(title) => format!("[{tag}] {title}: {message}"),
                    None => format!("[{tag}] {message}"),
                };
                vec![Output::Line(text)]
            }

            ConductorMessage::State { state } => {
                self.state = *state;
                Vec::new()
            }

            ConductorMessage::SessionInfo {
                session_id,
                base_url,
            } => vec![Output::Line(format!(
                "Connected to {base_url} (session {session_id})"
            ))],

            ConductorMessage::Ack { .. } => Vec::new(),

            ConductorMessage::Quit { message } => {
                self.quit = true;
                message
                    .as_ref()
                    .map(|m| vec![Output::Line(m.clone())])
                    .unwrap_or_default()
            }
        }
    }

    /// Numbered course list with the active sort filters
    pub fn course_list(&self) -> Vec<Output> {
        let order = match (self.sort.alphabetical, self.sort.by_credits) {
            (_, true) => "by credits",
            (true, false) => "alphabetical",
            (false, false) => "unsorted",
        };
        let mut out = vec![Output::Line(format!("Courses ({order}):"))];
        if self.courses.is_empty() {
            out.push(Output::Line("  (none)".to_string()));
        }
        for (i, course) in self.courses.iter().enumerate() {
            out.push(Output::Line(format!(
                "{:>3}. {} ({}, {} credits)",
                i + 1,
                course.name,
                course.course_id,
                course.credits
            )));
        }
        out
    }

    /// The transcript from the current scroll position
    pub fn history(&self) -> Vec<Output> {
        let lines = self.transcript_lines();
        if lines.is_empty() {
            return vec![Output::Line("(no messages yet)".to_string())];
        }
        let top = self.scroll_top.min(lines.len().saturating_sub(1));
        lines[top..].iter().cloned().map(Output::Line).collect()
    }

    /// Every committed entry, wrapped to the terminal width
    pub fn transcript_lines(&self) -> Vec<String> {
        self.messages
            .iter()
            .flat_map(|m| self.entry_lines(m))
            .collect()
    }

    fn entry_lines(&self, message: &DisplayMessage) -> Vec<String> {
        let prefix = match message.role {
            MessageRole::User => USER_PREFIX,
            MessageRole::Assistant => ASSISTANT_PREFIX,
        };
        let mut lines = vec![prefix.trim_end().to_string()];
        lines.extend(self.wrap(&message.content));
        lines
    }

    fn wrap(&self, text: &str) -> Vec<String> {
        textwrap::wrap(text, self.width)
            .into_iter()
            .map(|line| line.into_owned())
            .collect()
    }

    fn take_stream(&mut self, message_id: &MessageId) -> Option<StreamingView> {
        if self
            .streaming
            .as_ref()
            .is_some_and(|view| &view.id == message_id)
        {
            self.streaming.take()
        } else {
            None
        }
    }

    /// Terminal rows taken by the transient view, prefix included
    fn rows_used(&self, text: &str) -> usize {
        let shown = format!("{ASSISTANT_PREFIX}{text}");
        shown
            .split('\n')
            .map(|line| textwrap::core::display_width(line).div_ceil(self.width).max(1))
            .sum()
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Flatten a rendered HTML fragment into terminal text
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&unescape(&rest[..start]));
        let Some(len) = rest[start..].find('>') else {
            out.push_str(&unescape(&rest[start..]));
            rest = "";
            break;
        };

        let tag = &rest[start + 1..start + len];
        let closing = tag.starts_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match name.as_str() {
            "br" | "hr" => out.push('\n'),
            "li" if !closing => out.push_str("• "),
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "pre" | "blockquote"
            | "tr"
                if closing =>
            {
                out.push('\n');
            }
            _ => {}
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(&unescape(rest));

    // At most one blank line between blocks
    let mut text = String::with_capacity(out.len());
    let mut newlines = 0;
    for c in out.trim().chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        text.push(c);
    }
    text
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Write outputs to a terminal
///
/// `ansi` enables erasing the transient view; without it the view stays and
/// only a line break is written.
pub fn write_outputs<W: Write>(w: &mut W, outputs: &[Output], ansi: bool) -> io::Result<()> {
    for output in outputs {
        match output {
            Output::Line(line) => writeln!(w, "{line}")?,
            Output::Inline(text) => write!(w, "{text}")?,
            Output::ClearRows(rows) if ansi => {
                if *rows > 1 {
                    write!(w, "\x1b[{}F", rows - 1)?;
                } else {
                    write!(w, "\r")?;
                }
                write!(w, "\x1b[J")?;
            }
            Output::ClearRows(_) => writeln!(w)?,
        }
    }
    w.flush()
}

//! Line commands
//!
//! Everything typed at the terminal is either a slash command or free text
//! for the conversation. Commands that change Conductor state become
//! `SurfaceEvent`s; the rest are answered from the local display state.

use coursechat_core::{Course, SortKey, SubmitTrigger, SurfaceEvent};
use thiserror::Error;

/// A parsed input line
#[derive(Debug)]
pub enum Command {
    /// Forward to the Conductor
    Event(SurfaceEvent),
    /// Print the course list
    ListCourses,
    /// Print the transcript from the last scroll position
    History,
    /// Print command help
    Help,
}

/// Why a line could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '/{0}', try /help")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a course number")]
    NotANumber(String),

    #[error("No course {index}, the list has {count}")]
    NoSuchCourse { index: usize, count: usize },
}

/// Help text shown by `/help`
pub const HELP: &str = "\
Commands:
  /courses              list courses
  /learn <n>            ask about course n from the list
  /sort alpha|credits   toggle a sort filter
  /send <text>          send text (same as typing it)
  /cancel               stop the response in progress
  /history              show the discussion
  /quit                 leave
Anything else is sent as a message once a course has been chosen.";

/// Parse one input line against the courses currently shown
pub fn parse_line(line: &str, courses: &[Course]) -> Result<Command, CommandError> {
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(text(line, SubmitTrigger::EnterKey));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest.trim_end(), ""),
    };

    let event_id = SurfaceEvent::new_event_id();
    match name {
        "courses" | "c" => Ok(Command::ListCourses),
        "history" | "h" => Ok(Command::History),
        "help" | "?" => Ok(Command::Help),
        "cancel" => Ok(Command::Event(SurfaceEvent::CancelRequested { event_id })),
        "quit" | "q" | "exit" => Ok(Command::Event(SurfaceEvent::QuitRequested { event_id })),
        "send" => Ok(text(arg, SubmitTrigger::SendButton)),
        "sort" => {
            let key = match arg {
                "alpha" | "a" | "name" => SortKey::Alphabetical,
                "credits" | "cr" => SortKey::Credits,
                _ => return Err(CommandError::Usage("/sort alpha|credits")),
            };
            Ok(Command::Event(SurfaceEvent::SortToggled { event_id, key }))
        }
        "learn" | "l" => {
            if arg.is_empty() {
                return Err(CommandError::Usage("/learn <n>"));
            }
            let index: usize = arg
                .parse()
                .map_err(|_| CommandError::NotANumber(arg.to_string()))?;
            let course = index
                .checked_sub(1)
                .and_then(|i| courses.get(i))
                .ok_or(CommandError::NoSuchCourse {
                    index,
                    count: courses.len(),
                })?;
            Ok(Command::Event(SurfaceEvent::CourseSelected {
                event_id,
                course: course.clone(),
            }))
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn text(content: &str, trigger: SubmitTrigger) -> Command {
    Command::Event(SurfaceEvent::TextSubmitted {
        event_id: SurfaceEvent::new_event_id(),
        content: content.to_string(),
        trigger,
    })
}

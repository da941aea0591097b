//! Input Mode
//!
//! Decides how the next outbound message is framed. Picking a course sends a
//! templated question about it; typed text goes out verbatim. Free text is
//! only accepted once a course has been picked.

use thiserror::Error;

use crate::catalogue::Course;

/// Question sent when a course is picked
#[must_use]
pub fn default_prompt(subject: &str) -> String {
    format!(
        "There is a university course called {subject}, tell me about the topic and it's practical uses."
    )
}

/// Framing of the most recent outbound message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Templated question about a course
    DefaultPrompt {
        /// Course name
        subject: String,
    },
    /// Verbatim user text
    #[default]
    FreeForm,
}

/// Why a free-text submission was not sent
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputRejection {
    /// Empty or whitespace only
    #[error("message is empty")]
    Empty,

    /// No course has been picked yet
    #[error("pick a course before asking a question")]
    Locked,

    /// Larger than the configured limit
    #[error("message too large ({size} bytes, max {max})")]
    TooLarge {
        /// Submitted size in bytes
        size: usize,
        /// Limit in bytes
        max: usize,
    },

    /// A response is still streaming
    #[error("wait for the current response to finish")]
    Busy,
}

/// Tracks input mode and whether free text is accepted
#[derive(Clone, Debug)]
pub struct InputController {
    mode: InputMode,
    unlocked: bool,
    max_message_bytes: usize,
}

impl InputController {
    /// Create a locked controller
    #[must_use]
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            mode: InputMode::default(),
            unlocked: false,
            max_message_bytes,
        }
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    /// Whether free text is accepted
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Pick a course: unlock free text and frame the default prompt
    pub fn select_course(&mut self, course: &Course) -> String {
        self.mode = InputMode::DefaultPrompt {
            subject: course.name.clone(),
        };
        self.unlocked = true;
        default_prompt(&course.name)
    }

    /// Validate free text; on success it is sent unchanged
    pub fn submit(&mut self, text: &str) -> Result<String, InputRejection> {
        if text.trim().is_empty() {
            return Err(InputRejection::Empty);
        }
        if !self.unlocked {
            return Err(InputRejection::Locked);
        }
        if text.len() > self.max_message_bytes {
            return Err(InputRejection::TooLarge {
                size: text.len(),
                max: self.max_message_bytes,
            });
        }
        self.mode = InputMode::FreeForm;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::FieldValue;
    use pretty_assertions::assert_eq;

    fn course(name: &str, id: &str) -> Course {
        Course {
            name: name.to_string(),
            course_id: FieldValue::Text(id.to_string()),
            credits: FieldValue::Text("5".to_string()),
        }
    }

    #[test]
    fn test_default_prompt_wording() {
        assert_eq!(
            default_prompt("Algorithms"),
            "There is a university course called Algorithms, tell me about the topic and it's practical uses."
        );
    }

    #[test]
    fn test_locked_until_course_selected() {
        let mut input = InputController::new(1024);
        assert_eq!(input.submit("explain more"), Err(InputRejection::Locked));

        let message = input.select_course(&course("Algorithms", "CS-1"));
        assert_eq!(message, default_prompt("Algorithms"));
        assert_eq!(
            input.mode(),
            &InputMode::DefaultPrompt {
                subject: "Algorithms".to_string()
            }
        );

        assert_eq!(input.submit("explain more").unwrap(), "explain more");
        assert_eq!(input.mode(), &InputMode::FreeForm);
    }

    #[test]
    fn test_blank_text_rejected() {
        let mut input = InputController::new(1024);
        input.select_course(&course("Algorithms", "CS-1"));
        assert_eq!(input.submit(""), Err(InputRejection::Empty));
        assert_eq!(input.submit(" \t\n "), Err(InputRejection::Empty));
        assert!(matches!(input.mode(), InputMode::DefaultPrompt { .. }));
    }

    #[test]
    fn test_text_is_sent_verbatim() {
        let mut input = InputController::new(1024);
        input.select_course(&course("Algorithms", "CS-1"));
        assert_eq!(input.submit("  why?  ").unwrap(), "  why?  ");
    }

    #[test]
    fn test_size_limit() {
        let mut input = InputController::new(4);
        input.select_course(&course("Algorithms", "CS-1"));
        assert_eq!(
            input.submit("hello"),
            Err(InputRejection::TooLarge { size: 5, max: 4 })
        );
    }

    #[test]
    fn test_same_name_different_ids() {
        let mut input = InputController::new(1024);
        let first = input.select_course(&course("Physics", "PHY-100"));
        let second = input.select_course(&course("Physics", "PHY-200"));
        assert_eq!(first, default_prompt("Physics"));
        assert_eq!(second, default_prompt("Physics"));
    }
}

//! Course Catalogue
//!
//! The list of courses a user can ask about. It is fetched from the backend
//! once per client lifetime and cached; after that only the display order
//! changes.
//!
//! Two sort filters can be toggled independently. The view is always derived
//! from the original order, so switching both filters off restores exactly
//! what the backend returned. When both are on, the credit ordering wins.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendError, ConversationBackend};

/// Errors from the catalogue
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The catalogue has not been loaded
    #[error("Data not found.")]
    NotLoaded,

    /// Fetching the catalogue failed
    #[error("failed to fetch courses: {0}")]
    Fetch(#[from] BackendError),
}

/// A JSON field that may arrive as a string or a number
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value
    Number(serde_json::Number),
    /// Textual value
    Text(String),
}

impl FieldValue {
    /// Numeric interpretation of the value
    ///
    /// Blank text counts as zero. Text that is not a number yields `None`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
        }?;
        (!value.is_nan()).then_some(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A catalogue entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course name, used as the subject of the default prompt
    pub name: String,
    /// Course identifier
    pub course_id: FieldValue,
    /// Credit value
    pub credits: FieldValue,
}

impl Course {
    /// Numeric credit value, if it parses
    #[must_use]
    pub fn credits_value(&self) -> Option<f64> {
        self.credits.as_f64()
    }
}

/// Sort filter selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// By name, ascending
    Alphabetical,
    /// By credits, descending
    Credits,
}

/// Active sort filters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Alphabetical filter on
    pub alphabetical: bool,
    /// Credits filter on
    pub by_credits: bool,
}

impl SortState {
    /// Whether any filter is active
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.alphabetical || self.by_credits
    }
}

/// Cached course list plus sort state
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    original: Option<Vec<Course>>,
    sort: SortState,
}

impl Catalogue {
    /// Create an empty, unloaded catalogue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalogue from already-fetched courses
    #[must_use]
    pub fn from_courses(courses: Vec<Course>) -> Self {
        Self {
            original: Some(courses),
            sort: SortState::default(),
        }
    }

    /// Whether the courses have been fetched
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.original.is_some()
    }

    /// Fetch the courses unless a previous fetch already succeeded
    pub async fn ensure_loaded<B>(&mut self, backend: &B) -> Result<usize, CatalogueError>
    where
        B: ConversationBackend + ?Sized,
    {
        if let Some(courses) = &self.original {
            tracing::debug!(count = courses.len(), "Course catalogue already cached");
            return Ok(courses.len());
        }

        let courses = backend.fetch_courses().await?;
        tracing::info!(count = courses.len(), "Course catalogue loaded");
        let count = courses.len();
        self.original = Some(courses);
        Ok(count)
    }

    /// Current sort filters
    #[must_use]
    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Flip one sort filter and return the new view
    pub fn toggle(&mut self, key: SortKey) -> Result<Vec<Course>, CatalogueError> {
        match key {
            SortKey::Alphabetical => self.sort.alphabetical = !self.sort.alphabetical,
            SortKey::Credits => self.sort.by_credits = !self.sort.by_credits,
        }
        self.view()
    }

    /// Courses in display order
    pub fn view(&self) -> Result<Vec<Course>, CatalogueError> {
        let original = self.original.as_ref().ok_or(CatalogueError::NotLoaded)?;
        let mut courses = original.clone();

        if self.sort.by_credits {
            courses.sort_by(compare_credits_desc);
        } else if self.sort.alphabetical {
            courses.sort_by(compare_names);
        }

        Ok(courses)
    }
}

/// Case-insensitive name order, ties broken byte-wise
fn compare_names(a: &Course, b: &Course) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

/// Highest credits first; entries without numeric credits go last
fn compare_credits_desc(a: &Course, b: &Course) -> Ordering {
    match (a.credits_value(), b.credits_value()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Vec<Course> {
        serde_json::from_value(json!([
            { "name": "Operating Systems", "course_id": 301, "credits": "5" },
            { "name": "algorithms", "course_id": "CS-201", "credits": 10 },
            { "name": "Databases", "course_id": 150, "credits": 7.5 },
            { "name": "Ethics", "course_id": 90, "credits": "n/a" },
        ]))
        .unwrap()
    }

    fn names(courses: &[Course]) -> Vec<&str> {
        courses.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_parses_string_or_number_fields() {
        let courses = sample();
        assert_eq!(courses[0].course_id.to_string(), "301");
        assert_eq!(courses[1].course_id.to_string(), "CS-201");
        assert_eq!(courses[0].credits_value(), Some(5.0));
        assert_eq!(courses[2].credits_value(), Some(7.5));
        assert_eq!(courses[3].credits_value(), None);
    }

    #[test]
    fn test_unloaded_view_fails() {
        let catalogue = Catalogue::new();
        assert!(matches!(catalogue.view(), Err(CatalogueError::NotLoaded)));
        assert_eq!(CatalogueError::NotLoaded.to_string(), "Data not found.");
    }

    #[test]
    fn test_alphabetical_sort() {
        let mut catalogue = Catalogue::from_courses(sample());
        let view = catalogue.toggle(SortKey::Alphabetical).unwrap();
        assert_eq!(
            names(&view),
            vec!["algorithms", "Databases", "Ethics", "Operating Systems"]
        );
    }

    #[test]
    fn test_credit_sort_wins_over_alphabetical() {
        let mut catalogue = Catalogue::from_courses(sample());
        catalogue.toggle(SortKey::Alphabetical).unwrap();
        let view = catalogue.toggle(SortKey::Credits).unwrap();
        assert_eq!(
            names(&view),
            vec!["algorithms", "Databases", "Operating Systems", "Ethics"]
        );
        assert!(catalogue.sort_state().alphabetical);
        assert!(catalogue.sort_state().by_credits);
    }

    #[test]
    fn test_toggling_both_off_restores_original_order() {
        let original = sample();
        let mut catalogue = Catalogue::from_courses(original.clone());

        catalogue.toggle(SortKey::Alphabetical).unwrap();
        catalogue.toggle(SortKey::Credits).unwrap();
        catalogue.toggle(SortKey::Alphabetical).unwrap();
        let view = catalogue.toggle(SortKey::Credits).unwrap();

        assert_eq!(view, original);
        assert!(!catalogue.sort_state().is_sorted());
    }

    #[test]
    fn test_credits_off_falls_back_to_alphabetical() {
        let mut catalogue = Catalogue::from_courses(sample());
        catalogue.toggle(SortKey::Credits).unwrap();
        catalogue.toggle(SortKey::Alphabetical).unwrap();
        let view = catalogue.toggle(SortKey::Credits).unwrap();
        assert_eq!(view[0].name, "algorithms");
    }

    #[test]
    fn test_non_numeric_credits_sort_last_from_any_position() {
        let courses: Vec<Course> = serde_json::from_value(json!([
            { "name": "Ethics", "course_id": 90, "credits": "n/a" },
            { "name": "Algorithms", "course_id": "CS-201", "credits": 10 },
            { "name": "Databases", "course_id": 150, "credits": "5" },
        ]))
        .unwrap();
        let mut catalogue = Catalogue::from_courses(courses);

        let view = catalogue.toggle(SortKey::Credits).unwrap();
        assert_eq!(names(&view), vec!["Algorithms", "Databases", "Ethics"]);

        let view = catalogue.toggle(SortKey::Credits).unwrap();
        assert_eq!(names(&view), vec!["Ethics", "Algorithms", "Databases"]);
    }

    #[test]
    fn test_blank_and_nan_credit_text() {
        let blank = FieldValue::Text("  ".to_string());
        assert_eq!(blank.as_f64(), Some(0.0));
        let nan = FieldValue::Text("NaN".to_string());
        assert_eq!(nan.as_f64(), None);
    }
}

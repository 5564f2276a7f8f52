//! Entity services
//!
//! Each service validates its input, performs any upload or citation fetch
//! before touching the database, then delegates to the [`Repository`].
//! Services are cheap to build and are created per request around a
//! connection handle taken from the supervisor.
//!
//! [`Repository`]: crate::db::Repository

mod calendar;
mod course;
mod documents;
mod news;
mod personnel;
mod subject;

pub use calendar::CalendarService;
pub use course::CourseService;
pub use documents::DocumentService;
pub use news::{NewsInput, NewsService};
pub use personnel::{PersonnelService, SyncSummary};
pub use subject::SubjectService;

use crate::errors::{AppError, Result};
use validator::Validate;

/// Run `validator` rules, mapping failures to a 400
pub(crate) fn validate<T: Validate>(input: &T) -> Result<()> {
    input.validate().map_err(AppError::from)
}

/// Trimmed required text; blank is a missing field
pub(crate) fn required_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Positive id; zero, negative or absent is a validation failure
pub(crate) fn required_id(field: &str, value: Option<i32>) -> Result<i32> {
    match value {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(AppError::invalid_field(
            field,
            format!("{} must be a positive integer, got {}", field, id),
        )),
        None => Err(AppError::MissingField {
            field: field.to_string(),
        }),
    }
}

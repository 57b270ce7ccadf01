use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures raised while assembling a dates payload or validating
/// embargo input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatesError {
    /// An upstream object is missing something the payload depends on.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A deadline without an offset was about to be compared with an
    /// aware clock.
    #[error("ambiguous deadline {deadline} for {location}: stored without a timezone offset")]
    AmbiguousTime {
        location: String,
        deadline: NaiveDateTime,
    },

    #[error("User not enrolled.")]
    NotEnrolled,

    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),
}

pub type DatesResult<T> = Result<T, DatesError>;

//! Validation error model.

use thiserror::Error;

/// Result type used for client-side input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Client-side validation failure.
///
/// Raised before a request leaves the process; the remote API remains the
/// authority on everything else.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty (after trimming).
    #[error("{0} is required")]
    Required(&'static str),

    /// A value was present but malformed.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

/// Require a non-blank value, returning it trimmed.
pub fn require<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed)
    }
}

/// Minimal shape check for an email address (`local@domain`).
pub fn require_email(value: &str) -> ValidationResult<&str> {
    let email = require("email", value)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::invalid("email", "expected name@domain")),
    }
}

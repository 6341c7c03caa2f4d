//! Local form validation errors.
//!
//! Validation failures are raised before any request is built and never
//! reach the network.

use thiserror::Error;

/// Errors raised when user input fails local validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty (or whitespace only).
    #[error("{field} cannot be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A field exceeds its maximum length in characters.
    #[error("{field} too long (max {max} characters)")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// A field is shorter than its minimum length in characters.
    #[error("{field} too short (min {min} characters)")]
    TooShort {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum allowed length.
        min: usize,
    },
    /// The email address is not of the form `local@domain`.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// Priority outside of `1..=3`.
    #[error("priority must be 1, 2 or 3 (got {0})")]
    InvalidPriority(u8),
}

/// Checks that `value` is non-blank and at most `max` characters long.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] or [`ValidationError::TooLong`].
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Checks that `value` has at least `min` characters.
///
/// # Errors
///
/// Returns [`ValidationError::TooShort`] (or `Empty` for an empty value).
pub fn require_min(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

/// Minimal structural email check: one `@` with text on both sides and a
/// dot somewhere in the domain.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] when the shape is wrong.
pub fn require_email(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.contains('@') && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(trimmed.to_string()))
    }
}

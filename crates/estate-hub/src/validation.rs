//! Field-level validation shared by every resource payload.

use std::fmt;

/// Validation error for domain payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match the required format
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Number outside the accepted range
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    /// Unknown enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Referenced document does not exist
    MissingReference { field: &'static str, id: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::MissingReference { field, id } => {
                write!(f, "{} references unknown id '{}'", field, id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidVariant { field, .. }
            | Self::MissingReference { field, .. } => field,
        }
    }
}

pub const SHORT_TEXT: usize = 200;
pub const LONG_TEXT: usize = 20_000;

/// Trims `value` and rejects empty or oversized input.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but blank input collapses to `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => required_text(field, text, max).map(Some),
    }
}

/// Lower-cases and sanity-checks an email address.
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let normalized = required_text(field, value, SHORT_TEXT)?.to_ascii_lowercase();
    let mut parts = normalized.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || normalized.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be a valid email address",
        });
    }
    Ok(normalized)
}

pub fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(value)
}

/// Trims every entry, drops blanks and duplicates while keeping order.
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !cleaned.iter().any(|existing| existing == trimmed) {
            cleaned.push(trimmed.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 256,
        };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 256 characters"
        );
    }

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Loft  ", 10).unwrap(), "Loft");
        assert_eq!(
            required_text("name", "   ", 10),
            Err(ValidationError::Empty { field: "name" })
        );
        assert!(matches!(
            required_text("name", "abcdefghijk", 10),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn email_is_lower_cased() {
        assert_eq!(email("email", " Jane@Example.COM ").unwrap(), "jane@example.com");
        assert!(email("email", "not-an-email").is_err());
        assert!(email("email", "@example.com").is_err());
    }

    #[test]
    fn clean_list_dedupes() {
        let cleaned = clean_list(vec![
            " pool ".to_string(),
            "".to_string(),
            "gym".to_string(),
            "pool".to_string(),
        ]);
        assert_eq!(cleaned, vec!["pool", "gym"]);
    }
}

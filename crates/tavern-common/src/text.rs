//! Trimming and length checks for user-supplied text fields.
//!
//! Lengths are counted in Unicode scalar values after trimming, so a name of
//! fifty accented characters is accepted even though it is longer in bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// The user-facing field a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DisplayName,
    Room,
    Body,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::DisplayName => "display name",
            Field::Room => "room name",
            Field::Body => "message",
        };
        f.write_str(name)
    }
}

/// Trim `value` and check it is non-empty and at most `max` characters.
///
/// Returns the trimmed value on success.
pub fn validate_field(field: Field, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Like [`validate_field`] for chat bodies, where an empty body is not an
/// error but a silent no-op: `Ok(None)` means "nothing to send".
pub fn validate_optional_body(value: &str, max: usize) -> Result<Option<String>, ValidationError> {
    match validate_field(Field::Body, value, max) {
        Ok(body) => Ok(Some(body)),
        Err(ValidationError::Empty { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let v = validate_field(Field::DisplayName, "  Grog  ", 50).unwrap();
        assert_eq!(v, "Grog");
    }

    #[test]
    fn rejects_blank_values() {
        let err = validate_field(Field::Room, "   \t ", 50).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: Field::Room });
    }

    #[test]
    fn boundary_length_is_accepted() {
        let name = "a".repeat(50);
        assert!(validate_field(Field::DisplayName, &name, 50).is_ok());

        let name = "a".repeat(51);
        let err = validate_field(Field::DisplayName, &name, 50).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: Field::DisplayName,
                max: 50
            }
        );
    }

    #[test]
    fn length_is_measured_after_trim() {
        let padded = format!("   {}   ", "b".repeat(50));
        assert_eq!(validate_field(Field::Room, &padded, 50).unwrap().len(), 50);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let name = "é".repeat(50);
        assert!(name.len() > 50);
        assert!(validate_field(Field::DisplayName, &name, 50).is_ok());
    }

    #[test]
    fn empty_body_is_silent() {
        assert_eq!(validate_optional_body("   ", 1000), Ok(None));
        assert_eq!(
            validate_optional_body("  hi  ", 1000),
            Ok(Some("hi".to_string()))
        );
    }

    #[test]
    fn oversized_body_is_an_error() {
        let body = "x".repeat(1001);
        let err = validate_optional_body(&body, 1000).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: Field::Body,
                max: 1000
            }
        );
    }
}

//! Field-level input checks shared by the directory and ranking services.

use std::fmt;

/// Inclusive bounds for per-application and per-participation weight multipliers.
pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 10.0;

/// Maximum length of free-text ranking tags.
pub const MAX_TAG_CHARS: usize = 255;

/// Malformed or out-of-range input, reported against the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn require_weight(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(MIN_WEIGHT..=MAX_WEIGHT).contains(&value) {
        return Err(ValidationError::new(
            field,
            format!("must be between {MIN_WEIGHT} and {MAX_WEIGHT}"),
        ));
    }
    Ok(())
}

pub fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(
            field,
            "must be a finite, non-negative number",
        ));
    }
    Ok(())
}

/// Character-count bounds; lengths are counted in `char`s so CJK names are not penalised.
pub fn require_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            LengthBounds { min, max }.to_string(),
        ));
    }
    Ok(())
}

pub fn require_max_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must not exceed {max} characters"),
        ));
    }
    Ok(())
}

struct LengthBounds {
    min: usize,
    max: usize,
}

impl fmt::Display for LengthBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == 0 {
            write!(f, "must not exceed {} characters", self.max)
        } else {
            write!(
                f,
                "must be between {} and {} characters",
                self.min, self.max
            )
        }
    }
}

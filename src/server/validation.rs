//! Request field validation
//!
//! Every check matches the whole string; nothing is accepted by partial match.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::chat::types::Role;

/// Longest accepted chat message, in characters
pub const MAX_MESSAGE_CHARS: usize = 1024;

/// Longest accepted session name, in characters
pub const MAX_NAME_CHARS: usize = 64;

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

static SESSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid session id regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed for {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Trim and bound a chat message or saved content. Returns the trimmed text.
pub fn validate_message(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if len > MAX_MESSAGE_CHARS {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters, got {}", MAX_MESSAGE_CHARS, len),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_role(raw: &str) -> Result<Role, ValidationError> {
    raw.parse::<Role>().map_err(|reason| ValidationError::new("role", reason))
}

/// `#rrggbb`, nothing more
pub fn validate_color(raw: &str) -> Result<String, ValidationError> {
    if COLOR_RE.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(ValidationError::new("color", format!("'{}' is not a #rrggbb color", raw)))
    }
}

/// Trimmed session name. Empty is allowed and clears the name.
pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(
            "name",
            format!("must be at most {} characters", MAX_NAME_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_session_id(raw: &str) -> Result<(), ValidationError> {
    if SESSION_ID_RE.is_match(raw) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "sessionId",
            "must be 1-128 letters, digits, '-' or '_'",
        ))
    }
}

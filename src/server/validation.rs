//! Request validation utilities.
//!
//! Incoming fields are trimmed and checked here before any database work is
//! done, so an invalid request never reaches the store.

use serde_json::Value;
use std::fmt;

use crate::errors::DeskError;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for DeskError {
    fn from(err: ValidationError) -> Self {
        DeskError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate that a string is not empty or whitespace only.
///
/// # Example
/// ```
/// use licensedesk::server::validation::validate_not_empty;
///
/// assert!(validate_not_empty("hello", "name").is_ok());
/// assert!(validate_not_empty("", "name").is_err());
/// assert!(validate_not_empty("   ", "name").is_err());
/// ```
pub fn validate_not_empty(value: &str, field_name: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError {
            field: field_name.to_string(),
            message: "cannot be empty".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Require a present, non-blank string field and return it trimmed.
///
/// # Example
/// ```
/// use licensedesk::server::validation::require_text;
///
/// assert_eq!(require_text(Some("  LIC-1 "), "license_id").unwrap(), "LIC-1");
/// assert!(require_text(None, "license_id").is_err());
/// ```
pub fn require_text<'a>(value: Option<&'a str>, field_name: &str) -> ValidationResult<&'a str> {
    let value = value.ok_or_else(|| ValidationError {
        field: field_name.to_string(),
        message: "must be provided".to_string(),
    })?;
    validate_not_empty(value, field_name)?;
    Ok(value.trim())
}

/// Require a positive request id.
///
/// Accepts a JSON integer or a string holding one (surrounding whitespace
/// is ignored). Zero, negatives, fractions and anything else are rejected.
///
/// # Example
/// ```
/// use licensedesk::server::validation::require_request_id;
/// use serde_json::json;
///
/// assert_eq!(require_request_id(Some(&json!(42)), "request_id").unwrap(), 42);
/// assert_eq!(require_request_id(Some(&json!(" 7 ")), "request_id").unwrap(), 7);
/// assert!(require_request_id(Some(&json!(0)), "request_id").is_err());
/// ```
pub fn require_request_id(value: Option<&Value>, field_name: &str) -> ValidationResult<i64> {
    let invalid = |message: &str| ValidationError {
        field: field_name.to_string(),
        message: message.to_string(),
    };

    let id = match value {
        None | Some(Value::Null) => return Err(invalid("must be provided")),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
    .ok_or_else(|| invalid("must be an integer"))?;

    if id <= 0 {
        return Err(invalid("must be a positive integer"));
    }

    Ok(id)
}

/// Require a status token and return it as trimmed text.
///
/// Accepts a JSON string or a JSON integer, so `1` and `"1"` are the same
/// token. Whether the token names a known status is decided by the caller.
///
/// # Example
/// ```
/// use licensedesk::server::validation::require_status;
/// use serde_json::json;
///
/// assert_eq!(require_status(Some(&json!(" Approved ")), "status").unwrap(), "Approved");
/// assert_eq!(require_status(Some(&json!(0)), "status").unwrap(), "0");
/// assert!(require_status(Some(&json!(true)), "status").is_err());
/// ```
pub fn require_status(value: Option<&Value>, field_name: &str) -> ValidationResult<String> {
    match value {
        None | Some(Value::Null) => Err(ValidationError {
            field: field_name.to_string(),
            message: "must be provided".to_string(),
        }),
        Some(Value::String(s)) => require_text(Some(s), field_name).map(str::to_string),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(_) => Err(ValidationError {
            field: field_name.to_string(),
            message: "must be a string or an integer".to_string(),
        }),
    }
}

//! Input validation helpers
//!
//! Centralized text length constants and validation functions for handler
//! payloads that are not covered by `validator` derives.

use crate::utils::AppError;

/// Entity names: menu items, staff names
pub const MAX_NAME_LEN: usize = 200;

/// Notes, descriptions, cancel reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone, voucher code, OTP
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

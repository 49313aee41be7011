// src/validator.rs - Custom field rules shared by request structs
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("This field is required".into());
        return Err(error);
    }
    Ok(())
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if !USERNAME_REGEX.is_match(value) {
        let mut error = ValidationError::new("invalid_username");
        error.message = Some("Username may only contain letters, digits, '.', '_' and '-'".into());
        return Err(error);
    }
    Ok(())
}

/// Trims an optional text field, turning blank input into `None`.
pub fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

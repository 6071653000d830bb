use validator::{Validate, ValidateEmail};

use crate::error::{Error, Result};

pub fn validate<T: Validate>(val: &T) -> std::result::Result<(), validator::ValidationErrors> {
    val.validate()
}

/// Trims and lowercases, then checks the address shape.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::BadRequest("Email address is required".to_string()));
    }
    if !email.validate_email() {
        return Err(Error::BadRequest(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

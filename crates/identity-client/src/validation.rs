//! Input validation for sign-up and sign-in
//!
//! All validation is resolved locally before any network call so malformed
//! input never reaches the provider.

use crate::error::{AuthError, AuthResult};
use regex::Regex;
use std::sync::OnceLock;

/// Minimum accepted password length
pub const PASSWORD_MIN_LEN: usize = 6;
/// Maximum accepted password length
pub const PASSWORD_MAX_LEN: usize = 128;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\p{L}][\p{L} .'-]*$").unwrap())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap())
}

/// Validate a full name: non-empty, letters plus common name punctuation
pub fn validate_full_name(full_name: &str) -> AuthResult<()> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation("Full name is required".to_string()));
    }
    if !name_regex().is_match(trimmed) {
        return Err(AuthError::Validation(
            "Full name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate an RFC-shaped email address
pub fn validate_email(email: &str) -> AuthResult<()> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Validation("Email is required".to_string()));
    }
    if !email_regex().is_match(trimmed) {
        return Err(AuthError::Validation(
            "Email address is not valid".to_string(),
        ));
    }
    Ok(())
}

/// Validate password length bounds
pub fn validate_password(password: &str) -> AuthResult<()> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at most {} characters",
            PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Validate that the password and its confirmation match
pub fn validate_password_confirm(password: &str, confirm: &str) -> AuthResult<()> {
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

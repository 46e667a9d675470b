//! Provider error classification
//!
//! The provider reports some conditions only through human-readable message
//! text, so classification is isolated here in one function: structured
//! error codes are checked first, known message substrings second, and
//! anything unmatched becomes `AuthError::Unknown` rather than being
//! guessed at. The substring table is pinned by the tests below.

use crate::error::AuthError;
use crate::rest::ApiError;

/// Classify a provider error into the authentication error taxonomy
pub fn classify_provider_error(err: &ApiError) -> AuthError {
    // Structured error codes, when the provider supplies them.
    match err.code() {
        "user_already_exists" | "email_exists" => return AuthError::AlreadyExists,
        "invalid_credentials" => return AuthError::InvalidCredentials,
        "email_not_confirmed" => return AuthError::EmailUnconfirmed,
        _ => {}
    }

    // Known message wordings. Brittle by nature, so kept exhaustive and
    // pinned by tests.
    let message = err.message().to_lowercase();
    if message.contains("already registered") || message.contains("already exists") {
        return AuthError::AlreadyExists;
    }
    if message.contains("invalid login credentials") {
        return AuthError::InvalidCredentials;
    }
    if message.contains("email not confirmed") {
        return AuthError::EmailUnconfirmed;
    }

    AuthError::Unknown(format!("{} ({})", err.message(), err.status()))
}

//! Authentication error taxonomy
//!
//! Validation failures are resolved before any network call; provider and
//! transport errors are caught at the service boundary and surfaced through
//! these variants rather than propagating as raw transport errors.

use crate::rest::ApiError;
use thiserror::Error;

/// Errors produced by authentication and session operations
///
/// Display strings double as the user-facing messages for sign-in and
/// sign-up prompts.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Malformed input, caught locally before reaching the provider
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Email/password pair did not match an account
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but its email has not been confirmed
    #[error("Please verify your email before signing in")]
    EmailUnconfirmed,

    /// An account is already registered for this email
    #[error("This account already exists, sign in instead")]
    AlreadyExists,

    /// The user dismissed the OAuth browser flow
    #[error("Authentication cancelled by user")]
    UserCancelled,

    /// The OAuth browser flow reported a failure
    #[error("Authentication failed")]
    AuthFailed,

    /// The OAuth redirect completed but no session could be established
    #[error("Could not establish a session after sign-in")]
    SessionEstablishmentFailed,

    /// A user profile could not be created for a new identity
    #[error("Could not create a profile for this account")]
    ProfileCreationFailed,

    /// Required environment configuration is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider or transport error that maps to no specific variant
    #[error("Service error: {0}")]
    Api(#[from] ApiError),

    /// Unclassified provider error text
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Result type for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

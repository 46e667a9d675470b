//! Session and identity types
//!
//! This module holds the cached identity record, the access/refresh token
//! pair, and the helpers for inspecting token expiry. Token claims are
//! parsed without signature validation; the provider verified the tokens
//! when it issued them, the client only needs the expiry for refresh
//! decisions.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Sign-in provider for an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email/password registration
    Password,
    /// Google OAuth
    Google,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Password => write!(f, "password"),
            Provider::Google => write!(f, "google"),
        }
    }
}

/// A read-only cached copy of the provider's user record
///
/// Owned by the remote identity provider; the app holds this copy for the
/// process lifetime and never mutates it locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id (primary key shared with the profile row)
    pub id: String,
    /// Email address, when the provider exposes one
    pub email: Option<String>,
    /// The provider this identity registered through
    pub provider: Provider,
    /// When the identity was created on the provider
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Whether this identity was created within the trailing `window` of now
    ///
    /// Used by the OAuth resolver to distinguish a brand-new sign-up from a
    /// returning user.
    pub fn created_within(&self, window: Duration) -> bool {
        Utc::now() - self.created_at <= window
    }
}

/// Access/refresh token pair with provider-reported expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Access token for authenticated requests
    pub access_token: String,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: String,
    /// Expiry reported alongside the tokens, when the claims lack one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// An active session: token pair plus the identity it belongs to
///
/// Created on successful sign-in/sign-up/OAuth, refreshed transparently,
/// destroyed on sign-out. Exactly one per process; the session manager in
/// `app-state` is the single writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The token pair
    pub tokens: AuthTokens,
    /// The authenticated identity
    pub identity: Identity,
}

impl Session {
    /// Check if the access token has expired
    pub fn is_expired(&self) -> bool {
        match get_jwt_expiration(&self.tokens.access_token) {
            Some(exp) => exp <= Utc::now(),
            None => match self.tokens.expires_at {
                Some(exp) => exp <= Utc::now(),
                None => true,
            },
        }
    }

    /// Check if the access token expires within `threshold`
    pub fn is_expiring_soon(&self, threshold: Duration) -> bool {
        match get_jwt_expiration(&self.tokens.access_token) {
            Some(exp) => exp <= Utc::now() + threshold,
            None => match self.tokens.expires_at {
                Some(exp) => exp <= Utc::now() + threshold,
                None => true,
            },
        }
    }
}

/// Claims carried by the provider's access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Email claim, present on provider access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Additional claims
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Parse JWT claims without validating the signature
///
/// Informational only; never use this to authorize anything locally.
pub fn parse_jwt_claims(token: &str) -> Option<JwtClaims> {
    let header = decode_header(token).ok()?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    decode::<JwtClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}

/// Get the expiration time from a JWT token
///
/// Returns `None` if the token has no expiration claim or cannot be parsed.
pub fn get_jwt_expiration(token: &str) -> Option<DateTime<Utc>> {
    let claims = parse_jwt_claims(token)?;
    claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
}

/// Check if a JWT token is expired
///
/// A token without a parseable expiration is treated as expired.
pub fn is_jwt_expired(token: &str) -> bool {
    match get_jwt_expiration(token) {
        Some(exp_time) => exp_time <= Utc::now(),
        None => true,
    }
}

//! Environment configuration for the identity service
//!
//! The service base URL and public API key are read once at process start.
//! Their absence is a fatal configuration error for the OAuth path, so
//! [`IdentityConfig::from_env`] fails rather than degrading.

use crate::error::{AuthError, AuthResult};

/// Environment variable holding the identity service base URL
pub const ENV_SERVICE_URL: &str = "AUTH_SERVICE_URL";
/// Environment variable holding the public API key
pub const ENV_API_KEY: &str = "AUTH_API_KEY";
/// Environment variable overriding the OAuth redirect URI
pub const ENV_REDIRECT_URI: &str = "AUTH_REDIRECT_URI";

/// The app-scheme redirect target registered with the provider
///
/// Must match exactly what the provider is configured to redirect to.
pub const DEFAULT_REDIRECT_URI: &str = "tidewell://auth";

/// Identity service configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Service base URL (e.g., "https://id.example.com")
    pub base_url: String,
    /// Public API key
    pub api_key: String,
    /// OAuth callback redirect URI
    pub redirect_uri: String,
}

impl IdentityConfig {
    /// Create a config from explicit values
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    /// Override the OAuth redirect URI
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Read configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the service URL or API key is
    /// missing or empty.
    pub fn from_env() -> AuthResult<Self> {
        let base_url = read_required(ENV_SERVICE_URL)?;
        let api_key = read_required(ENV_API_KEY)?;
        let redirect_uri = std::env::var(ENV_REDIRECT_URI)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        Ok(Self {
            base_url,
            api_key,
            redirect_uri,
        })
    }
}

fn read_required(name: &str) -> AuthResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::Configuration(format!("{} is not set", name)))
}

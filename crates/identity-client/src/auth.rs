//! Credential/session operations against the identity service
//!
//! This module provides the high-level authentication flows: sign-up,
//! password sign-in, sign-out, password reset, and session fetch/refresh.
//! Every operation resolves validation locally, converts provider errors
//! through the classifier, and returns a typed result rather than letting
//! transport errors escape the service boundary.

use crate::classify::classify_provider_error;
use crate::config::IdentityConfig;
use crate::error::{AuthError, AuthResult};
use crate::rest::{RestClient, RestClientConfig, RestRequest};
use crate::session::{AuthTokens, Identity, Provider, Session};
use crate::validation::{
    validate_email, validate_full_name, validate_password, validate_password_confirm,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, RwLock};

/// Sign-up parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpParams {
    /// The user's full name
    pub full_name: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Password confirmation, must match `password`
    pub confirm_password: String,
}

/// Sign-in parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInParams {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

/// Service seam for the identity provider
///
/// The session manager and OAuth resolver depend on this trait rather than
/// the HTTP client so the provider can be mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Register a new account; returns the established session
    async fn sign_up(&self, params: SignUpParams) -> AuthResult<Session>;

    /// Authenticate with email and password
    async fn sign_in_with_password(&self, params: SignInParams) -> AuthResult<Session>;

    /// Invalidate the session; local state clears even if the remote call fails
    async fn sign_out(&self) -> AuthResult<()>;

    /// Request a password-reset email; no effect on the local session
    async fn reset_password(&self, email: &str) -> AuthResult<()>;

    /// Read-through session fetch, refreshing a stale token pair if possible
    async fn get_session(&self) -> AuthResult<Option<Session>>;

    /// Force a token refresh against the provider
    async fn refresh_session(&self) -> AuthResult<Option<Session>>;

    /// Install an explicit token pair, fetching the identity it belongs to
    async fn set_session(&self, access_token: &str, refresh_token: &str) -> AuthResult<Session>;

    /// Build the external authorization URL for a browser-based OAuth flow
    fn authorize_url(&self, provider: Provider) -> AuthResult<String>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct AppMetadata {
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    email: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    app_metadata: Option<AppMetadata>,
}

impl UserRecord {
    fn into_identity(self) -> Identity {
        let provider = match self
            .app_metadata
            .as_ref()
            .and_then(|m| m.provider.as_deref())
        {
            Some("google") => Provider::Google,
            _ => Provider::Password,
        };
        Identity {
            id: self.id,
            email: self.email,
            provider,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserRecord,
}

impl TokenResponse {
    fn into_session(self) -> AuthResult<Session> {
        let (Some(access_token), Some(refresh_token)) = (self.access_token, self.refresh_token)
        else {
            // The provider withholds tokens until the email is confirmed.
            return Err(AuthError::EmailUnconfirmed);
        };
        let expires_at = self
            .expires_in
            .and_then(TimeDelta::try_seconds)
            .map(|d| Utc::now() + d);
        Ok(Session {
            tokens: AuthTokens {
                access_token,
                refresh_token,
                expires_at,
            },
            identity: self.user.into_identity(),
        })
    }
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// HTTP implementation of [`IdentityApi`]
///
/// Holds the current token pair internally; the bearer header on the shared
/// [`RestClient`] tracks the stored session so data-API calls made through
/// the same client are authenticated.
pub struct AuthClient {
    rest: RestClient,
    config: IdentityConfig,
    session: Arc<RwLock<Option<Session>>>,
}

impl AuthClient {
    /// Create a new client from identity configuration
    pub fn new(config: IdentityConfig) -> Self {
        let rest = RestClient::new(RestClientConfig::new(
            config.base_url.clone(),
            config.api_key.clone(),
        ));
        Self {
            rest,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// The underlying REST client, shared with the profile repository
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    fn store_session(&self, session: Session) -> Session {
        self.rest
            .set_auth_header(Some(&session.tokens.access_token));
        let mut slot = self.session.write().unwrap();
        *slot = Some(session.clone());
        session
    }

    fn stored_session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    fn clear_session(&self) {
        let mut slot = self.session.write().unwrap();
        *slot = None;
        drop(slot);
        self.rest.set_auth_header(None);
    }

    async fn refresh_with_token(&self, refresh_token: &str) -> AuthResult<Session> {
        let request = RestRequest::post("/auth/v1/token")
            .query("grant_type", "refresh_token")
            .json_body(&json!({ "refresh_token": refresh_token }))
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        let response: TokenResponse = self.rest.send(request).await?;
        Ok(self.store_session(response.into_session()?))
    }
}

#[async_trait]
impl IdentityApi for AuthClient {
    async fn sign_up(&self, params: SignUpParams) -> AuthResult<Session> {
        validate_full_name(&params.full_name)?;
        validate_email(&params.email)?;
        validate_password(&params.password)?;
        validate_password_confirm(&params.password, &params.confirm_password)?;

        let request = RestRequest::post("/auth/v1/signup")
            .json_body(&json!({
                "email": params.email.trim(),
                "password": params.password,
                "data": { "full_name": params.full_name.trim() },
            }))
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        // Attempting creation doubles as the duplicate-account check; the
        // provider reports an existing registration as an error.
        let response: TokenResponse = self
            .rest
            .send(request)
            .await
            .map_err(|e| classify_provider_error(&e))?;

        Ok(self.store_session(response.into_session()?))
    }

    async fn sign_in_with_password(&self, params: SignInParams) -> AuthResult<Session> {
        validate_email(&params.email)?;
        validate_password(&params.password)?;

        let request = RestRequest::post("/auth/v1/token")
            .query("grant_type", "password")
            .json_body(&json!({
                "email": params.email.trim(),
                "password": params.password,
            }))
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        let response: TokenResponse = self
            .rest
            .send(request)
            .await
            .map_err(|e| classify_provider_error(&e))?;

        Ok(self.store_session(response.into_session()?))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let had_session = self.stored_session().is_some();

        if had_session {
            let result = self
                .rest
                .send_no_content(RestRequest::post("/auth/v1/logout"))
                .await;
            if let Err(e) = result {
                // An unreachable provider must not trap the user in an
                // authenticated state; local state clears regardless.
                tracing::warn!("Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }

        self.clear_session();
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;

        let request = RestRequest::post("/auth/v1/recover")
            .json_body(&json!({ "email": email.trim() }))
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        self.rest
            .send_no_content(request)
            .await
            .map_err(|e| classify_provider_error(&e))?;
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<Session>> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };

        if session.is_expired() {
            return self.refresh_session().await;
        }

        Ok(Some(session))
    }

    async fn refresh_session(&self) -> AuthResult<Option<Session>> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };

        match self.refresh_with_token(&session.tokens.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                Err(e)
            }
        }
    }

    async fn set_session(&self, access_token: &str, refresh_token: &str) -> AuthResult<Session> {
        let previous = self.rest.auth_header();
        self.rest.set_auth_header(Some(access_token));

        let user: UserRecord = match self.rest.send(RestRequest::get("/auth/v1/user")).await {
            Ok(user) => user,
            Err(e) => {
                // Restore whatever bearer state was in place before the attempt.
                match previous {
                    Some(header) => self
                        .rest
                        .set_auth_header(Some(header.trim_start_matches("Bearer "))),
                    None => self.rest.set_auth_header(None),
                }
                return Err(AuthError::Api(e));
            }
        };

        let session = Session {
            tokens: AuthTokens {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_at: None,
            },
            identity: user.into_identity(),
        };

        Ok(self.store_session(session))
    }

    fn authorize_url(&self, provider: Provider) -> AuthResult<String> {
        let mut url = url::Url::parse(&self.config.base_url)
            .map_err(|e| AuthError::Configuration(format!("Invalid service URL: {}", e)))?;
        url.set_path("/auth/v1/authorize");
        url.query_pairs_mut()
            .append_pair("provider", &provider.to_string())
            .append_pair("redirect_to", &self.config.redirect_uri);
        Ok(url.into())
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Browser-based OAuth sign-in resolution
//!
//! The external browser hands back a callback URL; the resolver turns that
//! callback into an established session. Providers differ in whether the
//! session lands server-side (picked up by polling) or arrives as tokens
//! embedded in the callback URL, so resolution runs through ordered stages
//! and stops at the first one that yields a session.

use crate::auth::IdentityApi;
use crate::error::{AuthError, AuthResult};
use crate::session::{Provider, Session};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of the external browser step
#[derive(Debug, Clone)]
pub enum BrowserResult {
    /// The browser returned to the app via the redirect URI
    Success {
        /// Full callback URL, including any fragment or query tokens
        callback_url: String,
    },
    /// The user dismissed the browser without completing sign-in
    Cancel,
    /// The browser failed before reaching the redirect URI
    Failure {
        /// Human-readable failure description
        reason: String,
    },
}

/// Seam for the platform's external-browser authentication surface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBrowser: Send + Sync {
    /// Open `authorize_url` and wait for the flow to settle
    async fn authenticate(&self, authorize_url: &str, redirect_uri: &str) -> BrowserResult;
}

/// Tuning knobs for callback resolution
#[derive(Debug, Clone)]
pub struct OauthConfig {
    /// Pause after the browser returns, letting the provider commit the session
    pub settle_delay: Duration,
    /// Number of refresh-then-check polling rounds
    pub poll_attempts: u32,
    /// Base interval between polling rounds; backs off linearly per round
    pub poll_interval: Duration,
    /// Identities created within this window count as brand new accounts
    pub new_user_window: chrono::Duration,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            poll_attempts: 3,
            poll_interval: Duration::from_millis(700),
            new_user_window: chrono::Duration::minutes(5),
            redirect_uri: crate::config::DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

/// A resolved OAuth sign-in
#[derive(Debug, Clone)]
pub struct OauthOutcome {
    /// The established session
    pub session: Session,
    /// Whether the identity was created during this flow
    pub is_new_user: bool,
}

/// Drives an external-browser OAuth flow to an established session
pub struct OauthResolver {
    api: Arc<dyn IdentityApi>,
    browser: Arc<dyn AuthBrowser>,
    config: OauthConfig,
}

impl OauthResolver {
    /// Create a resolver over an identity API and browser surface
    pub fn new(api: Arc<dyn IdentityApi>, browser: Arc<dyn AuthBrowser>) -> Self {
        Self {
            api,
            browser,
            config: OauthConfig::default(),
        }
    }

    /// Override the default resolution tuning
    pub fn with_config(mut self, config: OauthConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full sign-in flow for `provider`
    pub async fn sign_in(&self, provider: Provider) -> AuthResult<OauthOutcome> {
        let authorize_url = self.api.authorize_url(provider)?;

        tracing::info!("Starting OAuth sign-in with {}", provider);
        let browser_result = self
            .browser
            .authenticate(&authorize_url, &self.config.redirect_uri)
            .await;

        let callback_url = match browser_result {
            BrowserResult::Success { callback_url } => callback_url,
            BrowserResult::Cancel => return Err(AuthError::UserCancelled),
            BrowserResult::Failure { reason } => {
                tracing::warn!("OAuth browser step failed: {}", reason);
                return Err(AuthError::AuthFailed);
            }
        };

        tokio::time::sleep(self.config.settle_delay).await;

        // Stage 1: the provider may have committed the session server-side
        // already; polling with a refresh each round picks it up.
        if let Some(session) = self.poll_for_session().await {
            return Ok(self.outcome(session));
        }

        // Stage 2: some flows deliver the token pair in the callback URL
        // itself, as a fragment or as query parameters.
        if let Some((access, refresh)) = extract_callback_tokens(&callback_url) {
            tracing::debug!("Installing token pair from callback URL");
            match self.api.set_session(&access, &refresh).await {
                Ok(session) => return Ok(self.outcome(session)),
                Err(e) => tracing::warn!("Callback token installation failed: {}", e),
            }
        }

        // Stage 3: one last refresh in case the session landed late.
        if let Ok(Some(session)) = self.api.refresh_session().await {
            return Ok(self.outcome(session));
        }

        Err(AuthError::SessionEstablishmentFailed)
    }

    async fn poll_for_session(&self) -> Option<Session> {
        for attempt in 1..=self.config.poll_attempts {
            // Refresh first so a server-side session rotates into view, then
            // read whatever is stored.
            if let Ok(Some(session)) = self.api.refresh_session().await {
                return Some(session);
            }
            match self.api.get_session().await {
                Ok(Some(session)) => return Some(session),
                Ok(None) => {}
                Err(e) => tracing::debug!("Session poll attempt {} failed: {}", attempt, e),
            }
            if attempt < self.config.poll_attempts {
                tokio::time::sleep(self.config.poll_interval * attempt).await;
            }
        }
        None
    }

    fn outcome(&self, session: Session) -> OauthOutcome {
        let is_new_user = session.identity.created_within(self.config.new_user_window);
        OauthOutcome {
            session,
            is_new_user,
        }
    }
}

/// Pull an access/refresh token pair out of a callback URL
///
/// Checks the URL fragment first (`#access_token=...&refresh_token=...`),
/// then falls back to ordinary query parameters.
fn extract_callback_tokens(callback_url: &str) -> Option<(String, String)> {
    let url = url::Url::parse(callback_url).ok()?;

    if let Some(fragment) = url.fragment() {
        if let Some(pair) = tokens_from_pairs(url::form_urlencoded::parse(fragment.as_bytes())) {
            return Some(pair);
        }
    }

    tokens_from_pairs(url.query_pairs())
}

fn tokens_from_pairs<'a>(
    pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> Option<(String, String)> {
    let mut access = None;
    let mut refresh = None;
    for (key, value) in pairs {
        match key.as_ref() {
            "access_token" => access = Some(value.into_owned()),
            "refresh_token" => refresh = Some(value.into_owned()),
            _ => {}
        }
    }
    match (access, refresh) {
        (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => Some((a, r)),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockIdentityApi;
    use crate::session::{AuthTokens, Identity};
    use chrono::Utc;

    fn fast_config() -> OauthConfig {
        OauthConfig {
            settle_delay: Duration::ZERO,
            poll_attempts: 3,
            poll_interval: Duration::ZERO,
            ..OauthConfig::default()
        }
    }

    fn session_for(id: &str, created_at: chrono::DateTime<Utc>) -> Session {
        Session {
            tokens: AuthTokens {
                access_token: "acc".to_string(),
                refresh_token: "ref".to_string(),
                expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            },
            identity: Identity {
                id: id.to_string(),
                email: Some("g@example.com".to_string()),
                provider: Provider::Google,
                created_at,
            },
        }
    }

    fn api_with_authorize() -> MockIdentityApi {
        let mut api = MockIdentityApi::new();
        api.expect_authorize_url()
            .returning(|_| Ok("https://id.example.com/auth/v1/authorize?provider=google".to_string()));
        api
    }

    fn browser_returning(result: BrowserResult) -> MockAuthBrowser {
        let mut browser = MockAuthBrowser::new();
        browser
            .expect_authenticate()
            .times(1)
            .returning(move |_, _| result.clone());
        browser
    }

    #[tokio::test]
    async fn test_cancel_short_circuits_before_any_session_work() {
        let mut api = api_with_authorize();
        api.expect_refresh_session().times(0);
        api.expect_get_session().times(0);
        api.expect_set_session().times(0);

        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Cancel)),
        )
        .with_config(fast_config());

        let result = resolver.sign_in(Provider::Google).await;
        assert!(matches!(result, Err(AuthError::UserCancelled)));
    }

    #[tokio::test]
    async fn test_browser_failure_maps_to_auth_failed() {
        let api = api_with_authorize();
        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Failure {
                reason: "no browser available".to_string(),
            })),
        )
        .with_config(fast_config());

        let result = resolver.sign_in(Provider::Google).await;
        assert!(matches!(result, Err(AuthError::AuthFailed)));
    }

    #[tokio::test]
    async fn test_poll_picks_up_server_side_session() {
        let mut api = api_with_authorize();
        api.expect_refresh_session().returning(|| Ok(None));
        let mut calls = 0u32;
        api.expect_get_session().returning(move || {
            calls += 1;
            if calls >= 2 {
                Ok(Some(session_for("poll-user", Utc::now() - chrono::Duration::days(30))))
            } else {
                Ok(None)
            }
        });

        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Success {
                callback_url: "tidewell://auth?code=abc".to_string(),
            })),
        )
        .with_config(fast_config());

        let outcome = resolver.sign_in(Provider::Google).await.unwrap();
        assert_eq!(outcome.session.identity.id, "poll-user");
        assert!(!outcome.is_new_user);
    }

    #[tokio::test]
    async fn test_fragment_tokens_install_session() {
        let mut api = api_with_authorize();
        api.expect_refresh_session().returning(|| Ok(None));
        api.expect_get_session().returning(|| Ok(None));
        api.expect_set_session()
            .withf(|access, refresh| access == "frag-acc" && refresh == "frag-ref")
            .times(1)
            .returning(|_, _| Ok(session_for("frag-user", Utc::now())));

        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Success {
                callback_url: "tidewell://auth#access_token=frag-acc&refresh_token=frag-ref"
                    .to_string(),
            })),
        )
        .with_config(fast_config());

        let outcome = resolver.sign_in(Provider::Google).await.unwrap();
        assert_eq!(outcome.session.identity.id, "frag-user");
        // Identity created just now counts as a first sign-in.
        assert!(outcome.is_new_user);
    }

    #[tokio::test]
    async fn test_query_tokens_install_session() {
        let mut api = api_with_authorize();
        api.expect_refresh_session().returning(|| Ok(None));
        api.expect_get_session().returning(|| Ok(None));
        api.expect_set_session()
            .withf(|access, refresh| access == "q-acc" && refresh == "q-ref")
            .times(1)
            .returning(|_, _| Ok(session_for("query-user", Utc::now())));

        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Success {
                callback_url: "tidewell://auth?access_token=q-acc&refresh_token=q-ref".to_string(),
            })),
        )
        .with_config(fast_config());

        let outcome = resolver.sign_in(Provider::Google).await.unwrap();
        assert_eq!(outcome.session.identity.id, "query-user");
    }

    #[tokio::test]
    async fn test_all_stages_exhausted_is_establishment_failure() {
        let mut api = api_with_authorize();
        api.expect_refresh_session().returning(|| Ok(None));
        api.expect_get_session().returning(|| Ok(None));
        api.expect_set_session().times(0);

        let resolver = OauthResolver::new(
            Arc::new(api),
            Arc::new(browser_returning(BrowserResult::Success {
                callback_url: "tidewell://auth?error=server_error".to_string(),
            })),
        )
        .with_config(fast_config());

        let result = resolver.sign_in(Provider::Google).await;
        assert!(matches!(result, Err(AuthError::SessionEstablishmentFailed)));
    }

    #[test]
    fn test_extract_tokens_prefers_fragment() {
        let url = "tidewell://auth?access_token=qa&refresh_token=qr#access_token=fa&refresh_token=fr";
        assert_eq!(
            extract_callback_tokens(url),
            Some(("fa".to_string(), "fr".to_string()))
        );
    }

    #[test]
    fn test_extract_tokens_rejects_partial_pairs() {
        assert_eq!(extract_callbacks("tidewell://auth#access_token=only"), None);
        assert_eq!(extract_callbacks("tidewell://auth"), None);

        fn extract_callbacks(url: &str) -> Option<(String, String)> {
            extract_callback_tokens(url)
        }
    }
}

//! Session lifecycle coordination
//!
//! `SessionManager` sits between the UI shell and the identity/profile
//! crates. It drives the full sign-up, sign-in, and OAuth flows, keeps the
//! app's view of the current session, and broadcasts auth events so other
//! components can react to state changes. Events always publish after the
//! session state is written, so a subscriber that reads state on receipt
//! sees the new session.

use identity_client::{
    AuthBrowser, AuthError, AuthResult, IdentityApi, OauthConfig, OauthResolver, Provider,
    Session, SignInParams, SignUpParams,
};
use parking_lot::RwLock;
use profile_store::{NewProfile, ProfileStore, UserProfile};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Auth state change notifications
#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// A user signed in (password, sign-up, or OAuth)
    SignedIn(Session),
    /// The stored session's tokens were rotated or restored
    Refreshed(Session),
    /// The user signed out
    SignedOut,
}

/// Coordinates authentication, profile provisioning, and auth events
pub struct SessionManager {
    api: Arc<dyn IdentityApi>,
    profiles: Arc<dyn ProfileStore>,
    resolver: OauthResolver,
    state: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    /// Create a manager over the identity API, profile store, and browser
    pub fn new(
        api: Arc<dyn IdentityApi>,
        profiles: Arc<dyn ProfileStore>,
        browser: Arc<dyn AuthBrowser>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            resolver: OauthResolver::new(api.clone(), browser),
            api,
            profiles,
            state: RwLock::new(None),
            events,
        }
    }

    /// Override OAuth resolution tuning
    pub fn with_oauth_config(mut self, config: OauthConfig) -> Self {
        self.resolver = self.resolver.with_config(config);
        self
    }

    /// Subscribe to auth events
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// The current session, if signed in
    pub fn current_session(&self) -> Option<Session> {
        self.state.read().clone()
    }

    /// The signed-in identity, if any
    pub fn current_identity(&self) -> Option<identity_client::Identity> {
        self.state.read().as_ref().map(|s| s.identity.clone())
    }

    /// Whether a session is currently installed
    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_some()
    }

    /// Restore a persisted session at startup
    ///
    /// Refreshes stale tokens through the identity API; returns `None`
    /// without error when nothing is stored.
    pub async fn bootstrap(&self) -> AuthResult<Option<Session>> {
        match self.api.get_session().await {
            Ok(Some(session)) => {
                self.install(session.clone(), AuthEvent::Refreshed(session.clone()));
                Ok(Some(session))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!("Session restore failed: {}", e);
                Err(e)
            }
        }
    }

    /// Register a new account and provision its profile
    ///
    /// Profile provisioning is part of the operation: if the row cannot be
    /// created, the fresh session is torn down and the whole sign-up fails.
    pub async fn sign_up(&self, params: SignUpParams) -> AuthResult<Session> {
        let full_name = params.full_name.trim().to_string();
        let session = self.api.sign_up(params).await?;

        let new = NewProfile {
            id: session.identity.id.clone(),
            email: session.identity.email.clone(),
            full_name: Some(full_name),
        };

        if let Err(e) = self.profiles.create_profile(new).await {
            tracing::error!("Profile provisioning failed after sign-up: {}", e);
            // A session without a profile row is unusable; roll it back.
            let _ = self.api.sign_out().await;
            return Err(AuthError::ProfileCreationFailed);
        }

        self.install(session.clone(), AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Authenticate with email and password
    pub async fn sign_in(&self, params: SignInParams) -> AuthResult<Session> {
        let session = self.api.sign_in_with_password(params).await?;
        self.install(session.clone(), AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Run the browser-based Google sign-in flow
    ///
    /// For a brand-new identity (or an identity missing its row), the
    /// profile is provisioned before the session is installed; a
    /// provisioning failure signs the user back out.
    pub async fn sign_in_with_google(&self) -> AuthResult<Session> {
        let outcome = self.resolver.sign_in(Provider::Google).await?;
        let identity = &outcome.session.identity;

        let existing = match self.profiles.get_profile(&identity.id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile lookup failed after OAuth sign-in: {}", e);
                None
            }
        };

        if outcome.is_new_user || existing.is_none() {
            let new = NewProfile {
                id: identity.id.clone(),
                email: identity.email.clone(),
                full_name: None,
            };
            if let Err(e) = self.profiles.create_profile(new).await {
                tracing::error!("Profile provisioning failed after OAuth sign-in: {}", e);
                let _ = self.api.sign_out().await;
                return Err(AuthError::ProfileCreationFailed);
            }
        }

        let session = outcome.session;
        self.install(session.clone(), AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Sign out, clearing local state even if the provider is unreachable
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.api.sign_out().await?;
        {
            let mut state = self.state.write();
            *state = None;
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    /// Request a password-reset email
    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        self.api.reset_password(email).await
    }

    /// Force a token refresh
    pub async fn refresh(&self) -> AuthResult<Option<Session>> {
        match self.api.refresh_session().await? {
            Some(session) => {
                self.install(session.clone(), AuthEvent::Refreshed(session.clone()));
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Fetch the signed-in user's profile row
    pub async fn current_profile(&self) -> AuthResult<Option<UserProfile>> {
        let Some(identity) = self.current_identity() else {
            return Ok(None);
        };
        self.profiles
            .get_profile(&identity.id)
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))
    }

    fn install(&self, session: Session, event: AuthEvent) {
        {
            let mut state = self.state.write();
            *state = Some(session);
        }
        // Send can only fail when nobody is subscribed, which is fine.
        let _ = self.events.send(event);
    }
}

// =============================================================================
// Tests
// =============================================================================

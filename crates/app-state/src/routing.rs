//! Initial-route decisions
//!
//! On launch and after every auth change, the shell needs exactly one
//! answer: which screen to show. `RouteDecider` folds session and profile
//! state into that answer, provisioning a missing profile row along the way
//! and falling back to the welcome screen whenever the state cannot be
//! established in time.

use identity_client::{IdentityApi, Session};
use parking_lot::Mutex;
use profile_store::{NewProfile, ProfileStore};
use std::sync::Arc;
use std::time::Duration;

/// Top-level app destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRoute {
    /// Landing screen for signed-out users
    Welcome,
    /// Email/password sign-in form
    Login,
    /// Account creation form
    SignUp,
    /// First screen of the setup questionnaire
    SetupIntro,
    /// The main app experience
    Main,
}

impl AppRoute {
    /// Whether this destination requires a signed-in session
    pub fn requires_session(&self) -> bool {
        matches!(self, AppRoute::SetupIntro | AppRoute::Main)
    }
}

const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(5);

/// Decides the initial route from session and profile state
pub struct RouteDecider {
    api: Arc<dyn IdentityApi>,
    profiles: Arc<dyn ProfileStore>,
    cached: Mutex<Option<(String, AppRoute)>>,
    timeout: Duration,
}

impl RouteDecider {
    /// Create a decider over the identity API and profile store
    pub fn new(api: Arc<dyn IdentityApi>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            api,
            profiles,
            cached: Mutex::new(None),
            timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }

    /// Override the decision timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decide the launch route, bounded by the decision timeout
    ///
    /// A decision that cannot complete in time lands on [`AppRoute::Welcome`]
    /// rather than holding the splash screen open.
    pub async fn resolve_initial_route(&self, session: Option<&Session>) -> AppRoute {
        match tokio::time::timeout(self.timeout, self.decide(session)).await {
            Ok(route) => route,
            Err(_) => {
                tracing::warn!("Route decision timed out, falling back to welcome");
                AppRoute::Welcome
            }
        }
    }

    /// Decide the route for the given session state
    pub async fn decide(&self, session: Option<&Session>) -> AppRoute {
        let Some(session) = session else {
            *self.cached.lock() = None;
            return AppRoute::Welcome;
        };

        let identity = &session.identity;
        {
            let cached = self.cached.lock();
            if let Some((id, route)) = cached.as_ref() {
                if id == &identity.id {
                    return *route;
                }
            }
        }

        let route = match self.profiles.get_profile(&identity.id).await {
            Ok(Some(profile)) => {
                if profile.has_completed_onboarding() {
                    AppRoute::Main
                } else {
                    AppRoute::SetupIntro
                }
            }
            Ok(None) => {
                tracing::info!("No profile row for {}, provisioning one", identity.id);
                let new = NewProfile {
                    id: identity.id.clone(),
                    email: identity.email.clone(),
                    full_name: None,
                };
                match self.profiles.create_profile(new).await {
                    Ok(_) => AppRoute::SetupIntro,
                    Err(e) => {
                        tracing::error!("Profile provisioning failed during routing: {}", e);
                        return self.sign_out_to_welcome().await;
                    }
                }
            }
            Err(e) => {
                tracing::error!("Profile lookup failed during routing: {}", e);
                return self.sign_out_to_welcome().await;
            }
        };

        *self.cached.lock() = Some((identity.id.clone(), route));
        route
    }

    /// Drop the cached decision, forcing the next call to re-derive it
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    // A session whose profile cannot be established is unusable; tearing it
    // down prevents the shell from looping between splash and main.
    async fn sign_out_to_welcome(&self) -> AppRoute {
        if let Err(e) = self.api.sign_out().await {
            tracing::warn!("Forced sign-out failed: {}", e);
        }
        *self.cached.lock() = None;
        AppRoute::Welcome
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Hand-rolled fakes shared by the crate's unit tests

use async_trait::async_trait;
use identity_client::{
    AuthBrowser, AuthError, AuthResult, BrowserResult, IdentityApi, Provider, Session,
    SignInParams, SignUpParams,
};
use parking_lot::Mutex;
use profile_store::{
    NewProfile, OnboardingAnswers, ProfileError, ProfileResult, ProfileStore, ProfileUpdate,
    UserProfile,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted identity API
#[derive(Clone, Default)]
pub(crate) struct FakeIdentityApi {
    inner: Arc<ApiInner>,
}

#[derive(Default)]
struct ApiInner {
    password_session: Mutex<Option<Session>>,
    signup_session: Mutex<Option<Session>>,
    stored: Mutex<Option<Session>>,
    sign_out_calls: AtomicU32,
}

impl FakeIdentityApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session returned for any password sign-in
    pub fn with_password_session(self, session: Session) -> Self {
        *self.inner.password_session.lock() = Some(session);
        self
    }

    /// Session returned for any sign-up
    pub fn with_signup_session(self, session: Session) -> Self {
        *self.inner.signup_session.lock() = Some(session);
        self
    }

    /// Session already persisted before the app starts
    pub fn with_stored_session(self, session: Session) -> Self {
        *self.inner.stored.lock() = Some(session);
        self
    }

    pub fn sign_out_calls(&self) -> u32 {
        self.inner.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityApi for FakeIdentityApi {
    async fn sign_up(&self, _params: SignUpParams) -> AuthResult<Session> {
        match self.inner.signup_session.lock().clone() {
            Some(session) => {
                *self.inner.stored.lock() = Some(session.clone());
                Ok(session)
            }
            None => Err(AuthError::AlreadyExists),
        }
    }

    async fn sign_in_with_password(&self, _params: SignInParams) -> AuthResult<Session> {
        match self.inner.password_session.lock().clone() {
            Some(session) => {
                *self.inner.stored.lock() = Some(session.clone());
                Ok(session)
            }
            None => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.inner.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.stored.lock() = None;
        Ok(())
    }

    async fn reset_password(&self, _email: &str) -> AuthResult<()> {
        Ok(())
    }

    async fn get_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.inner.stored.lock().clone())
    }

    async fn refresh_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.inner.stored.lock().clone())
    }

    async fn set_session(&self, _access: &str, _refresh: &str) -> AuthResult<Session> {
        self.inner
            .stored
            .lock()
            .clone()
            .ok_or(AuthError::AuthFailed)
    }

    fn authorize_url(&self, provider: Provider) -> AuthResult<String> {
        Ok(format!("https://id.example.com/authorize?provider={provider}"))
    }
}

/// In-memory profile store with scriptable failures
#[derive(Clone, Default)]
pub(crate) struct FakeProfileStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    rows: Mutex<HashMap<String, UserProfile>>,
    created_log: Mutex<Vec<NewProfile>>,
    fail_creation: AtomicBool,
    fetch_delay: Mutex<Option<Duration>>,
    get_calls: AtomicU32,
}

impl FakeProfileStore {
    /// Seed a profile row
    pub fn with_row(self, profile: UserProfile) -> Self {
        self.inner.rows.lock().insert(profile.id.clone(), profile);
        self
    }

    /// Make every creation attempt fail
    pub fn failing_creation(self) -> Self {
        self.inner.fail_creation.store(true, Ordering::SeqCst);
        self
    }

    /// Delay every fetch, for timeout tests
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.inner.fetch_delay.lock() = Some(delay);
        self
    }

    pub fn created(&self) -> Vec<NewProfile> {
        self.inner.created_log.lock().clone()
    }

    pub fn get_calls(&self) -> u32 {
        self.inner.get_calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn profile_row(id: &str, onboarded: Option<bool>) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: None,
        full_name: None,
        avatar_url: None,
        onboarding_completed: onboarded,
        onboarding_completed_at: None,
        adhd_type: None,
        notification_style: None,
        energy_pattern: None,
        focus_preference: None,
        selected_goal: None,
        preferences: serde_json::Value::Null,
        created_at: None,
        updated_at: None,
    }
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn get_profile(&self, user_id: &str) -> ProfileResult<Option<UserProfile>> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.inner.rows.lock().get(user_id).cloned())
    }

    async fn create_profile(&self, new: NewProfile) -> ProfileResult<UserProfile> {
        self.inner.created_log.lock().push(new.clone());
        if self.inner.fail_creation.load(Ordering::SeqCst) {
            return Err(ProfileError::CreationFailed("scripted failure".to_string()));
        }
        let mut row = profile_row(&new.id, Some(false));
        row.email = new.email;
        row.full_name = new.full_name;
        self.inner.rows.lock().insert(new.id.clone(), row.clone());
        Ok(row)
    }

    async fn has_completed_onboarding(&self, user_id: &str) -> ProfileResult<bool> {
        Ok(self
            .inner
            .rows
            .lock()
            .get(user_id)
            .map(|p| p.has_completed_onboarding())
            .unwrap_or(false))
    }

    async fn complete_onboarding(
        &self,
        user_id: &str,
        answers: OnboardingAnswers,
    ) -> ProfileResult<()> {
        match self.inner.rows.lock().get_mut(user_id) {
            Some(row) => {
                row.adhd_type = Some(answers.adhd_type);
                row.notification_style = Some(answers.notification_style);
                row.energy_pattern = Some(answers.energy_pattern);
                row.focus_preference = Some(answers.focus_preference);
                row.selected_goal = Some(answers.selected_goal);
                row.onboarding_completed = Some(true);
                Ok(())
            }
            None => Err(ProfileError::Missing(user_id.to_string())),
        }
    }

    async fn reset_onboarding(&self, user_id: &str) -> ProfileResult<()> {
        match self.inner.rows.lock().get_mut(user_id) {
            Some(row) => {
                row.onboarding_completed = Some(false);
                Ok(())
            }
            None => Err(ProfileError::Missing(user_id.to_string())),
        }
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> ProfileResult<UserProfile> {
        let mut rows = self.inner.rows.lock();
        let row = rows
            .get_mut(user_id)
            .ok_or_else(|| ProfileError::Missing(user_id.to_string()))?;
        if let Some(goal) = update.selected_goal {
            row.selected_goal = Some(goal);
        }
        if let Some(name) = update.full_name {
            row.full_name = Some(name);
        }
        Ok(row.clone())
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> ProfileResult<()> {
        match self.inner.rows.lock().get_mut(user_id) {
            Some(row) => {
                row.preferences = preferences;
                Ok(())
            }
            None => Err(ProfileError::Missing(user_id.to_string())),
        }
    }

    async fn delete_profile(&self, user_id: &str) -> ProfileResult<()> {
        self.inner.rows.lock().remove(user_id);
        Ok(())
    }
}

/// Browser that always cancels, for flows that never reach OAuth
pub(crate) struct NullBrowser;

#[async_trait]
impl AuthBrowser for NullBrowser {
    async fn authenticate(&self, _authorize_url: &str, _redirect_uri: &str) -> BrowserResult {
        BrowserResult::Cancel
    }
}

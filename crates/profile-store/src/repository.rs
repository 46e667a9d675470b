//! Profile repository over the data API
//!
//! Reads and writes go through the shared [`RestClient`], so every call is
//! scoped by the signed-in user's bearer token and the table's row-level
//! policies. Creation is guarded: a database function provisions the row
//! atomically, with a merge-upsert as the fallback when the function is
//! unavailable.

use crate::types::{default_preferences, NewProfile, OnboardingAnswers, ProfileUpdate, UserProfile};
use async_trait::async_trait;
use identity_client::{ApiError, RestClient, RestRequest};
use serde_json::json;

const PROFILES_PATH: &str = "/rest/v1/profiles";
const CREATE_RPC_PATH: &str = "/rest/v1/rpc/create_user_profile_safe";

/// Errors from profile persistence
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileError {
    /// The data API rejected the request
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A request payload could not be encoded
    #[error("Failed to encode profile payload: {0}")]
    Encode(String),

    /// No profile row exists for the user
    #[error("No profile row for user {0}")]
    Missing(String),

    /// Both the guarded function and the upsert fallback failed
    #[error("Profile creation failed: {0}")]
    CreationFailed(String),
}

/// Convenience alias for profile results
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Persistence seam for user profiles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile row for a user, if one exists
    async fn get_profile(&self, user_id: &str) -> ProfileResult<Option<UserProfile>>;

    /// Provision a profile row; returns the existing row if one is present
    async fn create_profile(&self, new: NewProfile) -> ProfileResult<UserProfile>;

    /// Whether the user has finished the setup questionnaire
    async fn has_completed_onboarding(&self, user_id: &str) -> ProfileResult<bool>;

    /// Record the questionnaire answers and mark setup as finished
    async fn complete_onboarding(
        &self,
        user_id: &str,
        answers: OnboardingAnswers,
    ) -> ProfileResult<()>;

    /// Reopen the setup questionnaire
    async fn reset_onboarding(&self, user_id: &str) -> ProfileResult<()>;

    /// Apply a partial update and return the updated row
    async fn update_profile(&self, user_id: &str, update: ProfileUpdate)
        -> ProfileResult<UserProfile>;

    /// Replace the free-form preference blob
    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> ProfileResult<()>;

    /// Delete the profile row
    async fn delete_profile(&self, user_id: &str) -> ProfileResult<()>;
}

/// HTTP implementation of [`ProfileStore`]
#[derive(Clone)]
pub struct ProfileRepository {
    rest: RestClient,
}

impl ProfileRepository {
    /// Create a repository over a REST client
    ///
    /// Pass the identity client's transport so profile calls share its
    /// bearer token.
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    fn row_request(method_req: RestRequest, user_id: &str) -> RestRequest {
        method_req.query("id", format!("eq.{}", user_id))
    }

    async fn patch_row(&self, user_id: &str, body: serde_json::Value) -> ProfileResult<()> {
        let request = Self::row_request(RestRequest::patch(PROFILES_PATH), user_id)
            .json_body(&body)
            .map_err(|e| ProfileError::Encode(e.to_string()))?;
        self.rest.send_no_content(request).await?;
        Ok(())
    }

    async fn upsert_row(&self, new: &NewProfile) -> ProfileResult<UserProfile> {
        let body = json!({
            "id": new.id,
            "email": new.email,
            "full_name": new.full_name,
            "onboarding_completed": false,
            "preferences": default_preferences(),
        });
        let request = RestRequest::post(PROFILES_PATH)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json_body(&body)
            .map_err(|e| ProfileError::Encode(e.to_string()))?;

        let rows: Vec<UserProfile> = self.rest.send(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ProfileError::CreationFailed(format!("empty upsert result for {}", new.id)))
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn get_profile(&self, user_id: &str) -> ProfileResult<Option<UserProfile>> {
        let request = Self::row_request(RestRequest::get(PROFILES_PATH), user_id)
            .query("select", "*");
        let rows: Vec<UserProfile> = self.rest.send(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn create_profile(&self, new: NewProfile) -> ProfileResult<UserProfile> {
        // Idempotency check: a repeated creation attempt returns the row
        // that already exists instead of failing or duplicating.
        if let Some(existing) = self.get_profile(&new.id).await? {
            tracing::debug!("Profile already exists for {}", new.id);
            return Ok(existing);
        }

        let rpc_body = json!({
            "p_user_id": new.id,
            "p_email": new.email,
            "p_full_name": new.full_name,
        });
        let rpc = RestRequest::post(CREATE_RPC_PATH)
            .json_body(&rpc_body)
            .map_err(|e| ProfileError::Encode(e.to_string()))?;

        match self.rest.send_no_content(rpc).await {
            Ok(()) => {
                if let Some(profile) = self.get_profile(&new.id).await? {
                    return Ok(profile);
                }
                tracing::warn!("Creation function returned without a row for {}", new.id);
            }
            Err(e) => {
                tracing::warn!("Guarded profile creation failed, falling back to upsert: {}", e);
            }
        }

        self.upsert_row(&new).await
    }

    async fn has_completed_onboarding(&self, user_id: &str) -> ProfileResult<bool> {
        let profile = self.get_profile(user_id).await?;
        Ok(profile.map(|p| p.has_completed_onboarding()).unwrap_or(false))
    }

    async fn complete_onboarding(
        &self,
        user_id: &str,
        answers: OnboardingAnswers,
    ) -> ProfileResult<()> {
        // One request: answers and the completion flag land atomically, so
        // a concurrent reader never sees a half-onboarded row.
        let mut body = serde_json::to_value(&answers)
            .map_err(|e| ProfileError::Encode(e.to_string()))?;
        let fields = body
            .as_object_mut()
            .ok_or_else(|| ProfileError::Encode("answers did not encode as an object".to_string()))?;
        fields.insert("onboarding_completed".to_string(), json!(true));
        fields.insert(
            "onboarding_completed_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        self.patch_row(user_id, body).await
    }

    async fn reset_onboarding(&self, user_id: &str) -> ProfileResult<()> {
        self.patch_row(user_id, json!({ "onboarding_completed": false }))
            .await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> ProfileResult<UserProfile> {
        if update.is_empty() {
            return self
                .get_profile(user_id)
                .await?
                .ok_or_else(|| ProfileError::Missing(user_id.to_string()));
        }

        let request = Self::row_request(RestRequest::patch(PROFILES_PATH), user_id)
            .header("Prefer", "return=representation")
            .json_body(&update)
            .map_err(|e| ProfileError::Encode(e.to_string()))?;

        let rows: Vec<UserProfile> = self.rest.send(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ProfileError::Missing(user_id.to_string()))
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        preferences: serde_json::Value,
    ) -> ProfileResult<()> {
        self.patch_row(user_id, json!({ "preferences": preferences }))
            .await
    }

    async fn delete_profile(&self, user_id: &str) -> ProfileResult<()> {
        let request = Self::row_request(RestRequest::delete(PROFILES_PATH), user_id);
        self.rest.send_no_content(request).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

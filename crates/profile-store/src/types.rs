//! Profile row and patch types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A row from the `profiles` table
///
/// Server-managed columns are optional: a freshly provisioned row may not
/// have every field populated, and `onboarding_completed` is deliberately
/// tri-state. `None` means the column was never written, which routing
/// treats the same as `Some(false)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Identity ID this profile belongs to
    pub id: String,
    /// Email captured at creation time
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Whether the user finished the setup questionnaire
    #[serde(default)]
    pub onboarding_completed: Option<bool>,
    /// When the questionnaire was finished
    #[serde(default)]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    /// Self-reported ADHD presentation
    #[serde(default)]
    pub adhd_type: Option<String>,
    /// Preferred notification tone
    #[serde(default)]
    pub notification_style: Option<String>,
    /// When in the day the user has the most energy
    #[serde(default)]
    pub energy_pattern: Option<String>,
    /// Preferred focus-session shape
    #[serde(default)]
    pub focus_preference: Option<String>,
    /// The goal chosen during setup
    #[serde(default)]
    pub selected_goal: Option<String>,
    /// Free-form app preferences
    #[serde(default)]
    pub preferences: serde_json::Value,
    /// Row creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last row update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Whether the setup questionnaire has been completed
    pub fn has_completed_onboarding(&self) -> bool {
        self.onboarding_completed == Some(true)
    }
}

/// Parameters for provisioning a profile row
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    /// Identity ID the row belongs to
    pub id: String,
    /// Email to seed the row with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name to seed the row with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl NewProfile {
    /// Build creation parameters for an identity
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            full_name: None,
        }
    }

    /// Seed the row with an email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Seed the row with a display name
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

/// The answers collected by the setup questionnaire
///
/// Written in one request alongside the completion flag, so a profile is
/// never observed half-onboarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    /// Self-reported ADHD presentation
    pub adhd_type: String,
    /// Preferred notification tone
    pub notification_style: String,
    /// When in the day the user has the most energy
    pub energy_pattern: String,
    /// Preferred focus-session shape
    pub focus_preference: String,
    /// The goal chosen during setup
    pub selected_goal: String,
}

/// Partial update for a profile row
///
/// Only set fields are serialized, so an update touches exactly the columns
/// the caller names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// New ADHD presentation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adhd_type: Option<String>,
    /// New notification tone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_style: Option<String>,
    /// New energy pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_pattern: Option<String>,
    /// New focus-session shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_preference: Option<String>,
    /// New selected goal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_goal: Option<String>,
}

impl ProfileUpdate {
    /// Whether the patch carries any change at all
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.adhd_type.is_none()
            && self.notification_style.is_none()
            && self.energy_pattern.is_none()
            && self.focus_preference.is_none()
            && self.selected_goal.is_none()
    }
}

/// Default preference blob for a freshly provisioned profile
pub fn default_preferences() -> serde_json::Value {
    json!({
        "reminders_enabled": true,
        "sound_enabled": true,
        "theme": "system",
    })
}

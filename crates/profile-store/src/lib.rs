//! User profile persistence for Tidewell
//!
//! Profiles live in a `profiles` table behind the data API. This crate wraps
//! that table in a typed repository: fetch, guarded creation, onboarding
//! state transitions, and preference updates. It shares the identity
//! client's REST transport so reads and writes carry the signed-in user's
//! bearer token.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod repository;
pub mod types;

pub use repository::{ProfileError, ProfileRepository, ProfileResult, ProfileStore};
pub use types::{default_preferences, NewProfile, OnboardingAnswers, ProfileUpdate, UserProfile};

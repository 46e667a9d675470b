//! Identity provider client for Tidewell
//!
//! This crate wraps the remote identity service (auth endpoints plus the
//! REST data API transport), including session token handling, input
//! validation, provider error classification, and the browser-based OAuth
//! callback resolver.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod oauth;
pub mod rest;
pub mod session;
pub mod validation;

pub use auth::{AuthClient, IdentityApi, SignInParams, SignUpParams};
pub use config::IdentityConfig;
pub use error::{AuthError, AuthResult};
pub use oauth::{AuthBrowser, BrowserResult, OauthConfig, OauthOutcome, OauthResolver};
pub use rest::{ApiError, RestClient, RestClientConfig, RestRequest};
pub use session::{AuthTokens, Identity, Provider, Session};

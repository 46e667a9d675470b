//! Application state management for Tidewell
//!
//! This crate owns the signed-in state of the app shell: the session
//! lifecycle (sign-up, sign-in, OAuth, restore, sign-out) with broadcast
//! auth events, and the routing engine that turns session-plus-profile
//! state into an initial screen.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod routing;
pub mod session;

#[cfg(test)]
mod testing;

pub use routing::{AppRoute, RouteDecider};
pub use session::{AuthEvent, SessionManager};

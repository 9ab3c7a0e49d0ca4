//! Route definitions
//!
//! The intake has a single catch-all route.

use axum::Router;

use crate::handlers::webhook;
use crate::state::IntakeState;

/// Create the router: every path and method reaches the webhook
pub fn create_router() -> Router<IntakeState> {
    Router::new().fallback(webhook::receive)
}

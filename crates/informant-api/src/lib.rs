//! # informant-api
//!
//! Webhook intake built with Axum, plus the lifecycle that wires the intake,
//! background sync and dispatch loop together around one cancellation token.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, run, serve, serve_with_listener};
pub use state::IntakeState;

//! # informant-matrix
//!
//! `NetworkSession` implementation over the Matrix client-server API.
//!
//! Covers password login with device reuse, long-poll sync with a persisted
//! cursor, media upload, message sends, joins and profile updates. Room
//! traffic is sent unencrypted.

pub mod client;
pub mod config;
pub mod store;
pub mod sync;

pub use client::MatrixSession;
pub use config::MatrixConfig;
pub use store::{SessionStore, StoredSession};

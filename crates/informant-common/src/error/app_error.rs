//! Application error types
//!
//! Everything here is fatal: these errors end startup (or end the process
//! after shutdown) with a non-zero exit status. Operational failures during
//! dispatch are logged where they happen and never become an `AppError`.

use informant_core::SessionError;

use crate::config::ConfigError;

/// Application-wide fatal error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Network session errors
    #[error("Failed to initialize network session: {0}")]
    Session(#[source] SessionError),

    #[error("Background sync stopped: {0}")]
    Sync(#[source] SessionError),

    // Listener errors
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get error code for log output
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Session(_) => "SESSION_ERROR",
            Self::Sync(_) => "SYNC_ERROR",
            Self::Bind { .. } => "BIND_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a bind error
    pub fn bind(addr: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

//! Session errors - failures reported by a `NetworkSession`

use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the messaging network boundary
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Network Errors
    // =========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    // =========================================================================
    // Homeserver Errors
    // =========================================================================
    #[error("Homeserver returned {status} {errcode}: {message}")]
    Api {
        status: u16,
        errcode: String,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    #[error("Session store error: {0}")]
    Store(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Session is closed")]
    Closed,
}

impl SessionError {
    /// Check if the homeserver rejected our credentials
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Api {
                status, errcode, ..
            } => {
                matches!(*status, 401 | 403)
                    || matches!(errcode.as_str(), "M_UNKNOWN_TOKEN" | "M_MISSING_TOKEN" | "M_FORBIDDEN")
            }
            _ => false,
        }
    }

    /// Check if the same request may succeed when tried again later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get error code for log output
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Timeout => "TIMEOUT",
            Self::Api { errcode, .. } => errcode,
            Self::Decode(_) => "DECODE",
            Self::Store(_) => "STORE",
            Self::InvalidId(_) => "INVALID_ID",
            Self::Closed => "CLOSED",
        }
    }
}

//! Service layer error types

use informant_core::SessionError;
use std::fmt;
use std::path::PathBuf;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Network session call failed
    Session(SessionError),

    /// Avatar file could not be read
    Avatar { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(e) => write!(f, "{e}"),
            Self::Avatar { path, source } => {
                write!(f, "Cannot read avatar {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(e) => Some(e),
            Self::Avatar { source, .. } => Some(source),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

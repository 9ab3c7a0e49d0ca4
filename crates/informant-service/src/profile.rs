//! Best-effort profile setup at startup
//!
//! Failures are logged and never abort startup.

use informant_common::AppConfig;
use informant_core::NetworkSession;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Used when the avatar file extension says nothing about its type
const FALLBACK_AVATAR_TYPE: &str = "image/png";

/// Desired account profile. `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSettings {
    pub display_name: Option<String>,
    pub avatar: Option<PathBuf>,
}

impl From<&AppConfig> for ProfileSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            display_name: Some(config.display.clone()).filter(|name| !name.is_empty()),
            avatar: Some(config.avatar.as_str())
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Apply display name and avatar, logging each failure
pub async fn apply_profile(session: &dyn NetworkSession, settings: &ProfileSettings) {
    if let Some(name) = &settings.display_name {
        match session.set_display_name(name).await {
            Ok(()) => info!(display_name = %name, "Display name set"),
            Err(e) => warn!(display_name = %name, error = %e, "Failed to set display name"),
        }
    }

    if let Some(path) = &settings.avatar {
        match set_avatar_from_file(session, path).await {
            Ok(content_type) => info!(path = %path.display(), content_type, "Avatar set"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to set avatar"),
        }
    }
}

async fn set_avatar_from_file(
    session: &dyn NetworkSession,
    path: &Path,
) -> ServiceResult<&'static str> {
    let image = tokio::fs::read(path)
        .await
        .map_err(|source| ServiceError::Avatar {
            path: path.to_path_buf(),
            source,
        })?;
    let content_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_AVATAR_TYPE);

    session.set_avatar(&image, content_type).await?;
    Ok(content_type)
}

//! Matrix session configuration

use informant_common::AppConfig;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Device display name shown in the account's session list
const DEVICE_DISPLAY_NAME: &str = "matrix-informant";

/// Everything a `MatrixSession` needs to log in and run
#[derive(Clone)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub username: String,
    pub password: String,
    pub store_path: PathBuf,
    pub store_key: String,
    pub device_display_name: String,
    /// Bound on non-sync requests; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    pub sync_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl MatrixConfig {
    /// Grace period on top of the long-poll timeout before a sync request is abandoned
    pub const SYNC_GRACE: Duration = Duration::from_secs(30);

    /// HTTP timeout for a single `/sync` request
    #[must_use]
    pub fn sync_request_timeout(&self) -> Duration {
        self.sync_timeout + Self::SYNC_GRACE
    }
}

impl From<&AppConfig> for MatrixConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            homeserver: config.homeserver.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            store_path: config.database.path.clone(),
            store_key: config.database.key.clone(),
            device_display_name: DEVICE_DISPLAY_NAME.to_string(),
            request_timeout: config.network.request_timeout(),
            sync_timeout: config.network.sync_timeout(),
            reconnect_delay: config.network.reconnect_delay(),
        }
    }
}

impl fmt::Debug for MatrixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixConfig")
            .field("homeserver", &self.homeserver)
            .field("username", &self.username)
            .field("store_path", &self.store_path)
            .field("request_timeout", &self.request_timeout)
            .field("sync_timeout", &self.sync_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}

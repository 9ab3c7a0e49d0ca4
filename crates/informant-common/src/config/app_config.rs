//! Application configuration structs
//!
//! Loads configuration from a YAML file, then applies `INFORMANT__*`
//! environment overrides (e.g. `INFORMANT__DATABASE__KEY`).

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config path used when `-c` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./conf/informant.yaml";

/// Prefix for environment overrides
const ENV_PREFIX: &str = "INFORMANT";

/// Main application configuration
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Listen address of the webhook intake
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Homeserver base URL
    pub homeserver: String,
    pub username: String,
    pub password: String,
    /// Display name applied at startup, skipped when empty
    #[serde(default)]
    pub display: String,
    /// Avatar image path applied at startup, skipped when empty
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Raises log verbosity to DEBUG
    #[serde(default)]
    pub debug: bool,
    /// Shared secret submissions must present
    #[serde(default)]
    pub psk: String,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Session store configuration
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub key: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            key: String::new(),
        }
    }
}

/// Dispatch loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Pause after each submission, in milliseconds
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Capacity of the hand-off channel
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchConfig {
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Homeserver connection tuning
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Upper bound on a single send/upload/profile request; unset means none
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Long-poll timeout passed to `/sync`
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,
    /// Wait between failed sync attempts
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            sync_timeout_ms: default_sync_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./informant-session.json")
}

fn default_send_interval_ms() -> u64 {
    250
}

fn default_queue_capacity() -> usize {
    1
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_sync_timeout_ms() -> u64 {
    30_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Load configuration from a YAML file plus environment overrides
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if a value is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config: Self = settings.try_deserialize().map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without environment overrides
    ///
    /// # Errors
    /// Returns an error if the YAML is malformed or a value is invalid
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let parsed = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| ConfigError::Load {
                path: "<inline>".to_string(),
                reason: e.to_string(),
            })?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    /// Returns the first invalid value found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.homeserver)
            .map_err(|e| ConfigError::InvalidValue("homeserver", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(
                "homeserver",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        self.bind_addr()?;

        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingValue("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingValue("password"));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "dispatch.queue_capacity",
                "must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Intake listen address in a form `TcpListener::bind` resolves
    ///
    /// `host:port` is passed through, so hostnames are accepted. A bare
    /// `:port` listens on all interfaces.
    ///
    /// # Errors
    /// Returns an error if `bind` has no numeric port
    pub fn bind_addr(&self) -> Result<String, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue("bind", reason.to_string());

        let (host, port) = self
            .bind
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port or :port"))?;
        port.parse::<u16>()
            .map_err(|e| invalid(&format!("invalid port '{port}': {e}")))?;

        if host.is_empty() {
            Ok(format!("0.0.0.0:{port}"))
        } else {
            Ok(self.bind.clone())
        }
    }
}

// Credentials and secrets stay out of log output
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("homeserver", &self.homeserver)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("display", &self.display)
            .field("avatar", &self.avatar)
            .field("database", &self.database)
            .field("debug", &self.debug)
            .field("psk", &"<redacted>")
            .field("dispatch", &self.dispatch)
            .field("intake", &self.intake)
            .field("network", &self.network)
            .field("log", &self.log)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("path", &self.path)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r"
homeserver: https://matrix.example.org
username: informant
password: hunter2
";

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.database.path, PathBuf::from("./informant-session.json"));
        assert!(!config.debug);
        assert!(config.psk.is_empty());
        assert_eq!(config.dispatch.send_interval(), Duration::from_millis(250));
        assert_eq!(config.dispatch.queue_capacity, 1);
        assert_eq!(config.network.request_timeout(), None);
        assert_eq!(config.network.sync_timeout(), Duration::from_secs(30));
        assert!(!config.log.json);
    }

    #[test]
    fn test_full_config() {
        let yaml = r"
bind: 0.0.0.0:9000
homeserver: http://localhost:8008
username: bot
password: pw
display: Informant
avatar: ./avatar.png
database:
  path: /var/lib/informant/session.json
  key: passphrase
debug: true
psk: secret
dispatch:
  send_interval_ms: 10
  queue_capacity: 8
network:
  request_timeout_secs: 15
";
        let config = AppConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:9000");
        assert_eq!(config.display, "Informant");
        assert_eq!(config.avatar, "./avatar.png");
        assert_eq!(config.database.key, "passphrase");
        assert!(config.debug);
        assert_eq!(config.psk, "secret");
        assert_eq!(config.dispatch.send_interval(), Duration::from_millis(10));
        assert_eq!(config.dispatch.queue_capacity, 8);
        assert_eq!(config.network.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_invalid_homeserver() {
        let yaml = "homeserver: ftp://x\nusername: a\npassword: b\n";
        assert!(matches!(
            AppConfig::from_yaml_str(yaml),
            Err(ConfigError::InvalidValue("homeserver", _))
        ));
    }

    #[test]
    fn test_invalid_bind() {
        let yaml = format!("{MINIMAL}bind: not-an-address\n");
        assert!(matches!(
            AppConfig::from_yaml_str(&yaml),
            Err(ConfigError::InvalidValue("bind", _))
        ));
    }

    #[test]
    fn test_bind_without_host_listens_on_all_interfaces() {
        let yaml = format!("{MINIMAL}bind: \":8080\"\n");
        let config = AppConfig::from_yaml_str(&yaml).unwrap();

        assert_eq!(config.bind, ":8080");
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_accepts_hostname() {
        let yaml = format!("{MINIMAL}bind: localhost:8080\n");
        let config = AppConfig::from_yaml_str(&yaml).unwrap();

        assert_eq!(config.bind_addr().unwrap(), "localhost:8080");
    }

    #[test]
    fn test_bind_rejects_bad_port() {
        let yaml = format!("{MINIMAL}bind: \"localhost:http-alt\"\n");
        assert!(matches!(
            AppConfig::from_yaml_str(&yaml),
            Err(ConfigError::InvalidValue("bind", _))
        ));
    }

    #[test]
    fn test_zero_queue_capacity_rejected() {
        let yaml = format!("{MINIMAL}dispatch:\n  queue_capacity: 0\n");
        assert!(AppConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = "homeserver: https://x\nusername: a\n";
        assert!(matches!(
            AppConfig::from_yaml_str(yaml),
            Err(ConfigError::Load { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.username, "informant");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/informant.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/informant.yaml"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let yaml = format!("{MINIMAL}psk: topsecret\n");
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("topsecret"));
    }
}

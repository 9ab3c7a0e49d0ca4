//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, ConfigError, DatabaseConfig, DispatchConfig, IntakeConfig, LogConfig,
    NetworkConfig, DEFAULT_CONFIG_PATH,
};

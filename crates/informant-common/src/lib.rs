//! # informant-common
//!
//! Shared utilities including configuration, error handling, authentication, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{SharedSecret, StoreCipher, StoreKeyError};
pub use config::{
    AppConfig, ConfigError, DatabaseConfig, DispatchConfig, IntakeConfig, LogConfig,
    NetworkConfig, DEFAULT_CONFIG_PATH,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};

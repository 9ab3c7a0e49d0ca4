use informant_common::AppConfig;
use std::time::Duration;

/// Pacing of the dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Pause after each submission, whether or not anything was sent
    pub send_interval: Duration,
}

impl DispatchPolicy {
    pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(250);

    pub fn new(send_interval: Duration) -> Self {
        Self { send_interval }
    }

    /// No pause between submissions
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEND_INTERVAL)
    }
}

impl From<&AppConfig> for DispatchPolicy {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.dispatch.send_interval())
    }
}

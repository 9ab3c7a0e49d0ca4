//! Test helpers for integration tests
//!
//! Provides a running informant instance and HTTP helpers to drive it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use informant_api::serve_with_listener;
use informant_common::{AppConfig, AppResult};
use informant_core::testing::{RecordingSession, SessionCall};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Account the recording session is logged in as
pub const TEST_USER: &str = "@informant:matrix.test";

/// Shared secret used by `test_config`
pub const TEST_PSK: &str = "secret";

/// How long tests wait for the dispatch loop to catch up
pub const WAIT: Duration = Duration::from_secs(5);

/// Running informant instance
pub struct TestInformant {
    pub addr: SocketAddr,
    pub client: Client,
    pub session: Arc<RecordingSession>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<AppResult<()>>>,
}

impl TestInformant {
    /// Start with the default test configuration
    pub async fn start() -> Result<Self> {
        Self::start_with(test_config()?, RecordingSession::shared(TEST_USER)).await
    }

    /// Start with a custom config and session
    pub async fn start_with(config: AppConfig, session: Arc<RecordingSession>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let handle = {
            let session = session.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                serve_with_listener(listener, &config, session, shutdown).await
            })
        };

        // Handlers are registered before sync starts
        let started = session
            .wait_for(1, WAIT, |c| *c == SessionCall::SyncStarted)
            .await;
        anyhow::ensure!(started, "sync task never started");

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            session,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Get base URL for the intake
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// POST a JSON body to `/`
    pub async fn post<T: Serialize>(&self, body: &T) -> Result<Response> {
        Ok(self.client.post(self.base_url()).json(body).send().await?)
    }

    /// POST a raw body to `path`
    pub async fn post_raw(&self, path: &str, body: &'static str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).body(body).send().await?)
    }

    /// Wait until the lifecycle returns on its own
    pub async fn finished(&mut self) -> Result<AppResult<()>> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow::anyhow!("lifecycle already awaited"))?;
        Ok(tokio::time::timeout(WAIT, handle).await??)
    }

    /// Trigger shutdown as a signal would and wait for the lifecycle to end
    pub async fn shutdown(&mut self) -> Result<AppResult<()>> {
        self.shutdown.cancel();
        self.finished().await
    }
}

impl Drop for TestInformant {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Configuration with a zero send interval so tests run fast
pub fn test_config() -> Result<AppConfig> {
    config_from_yaml(&format!(
        r"
homeserver: https://matrix.test
username: informant
password: password
psk: {TEST_PSK}
dispatch:
  send_interval_ms: 0
"
    ))
}

/// Parse a test configuration
pub fn config_from_yaml(yaml: &str) -> Result<AppConfig> {
    AppConfig::from_yaml_str(yaml).map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}

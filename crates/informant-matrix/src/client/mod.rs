//! Matrix implementation of `NetworkSession`
//!
//! `MatrixSession::login` resumes the stored device when the store belongs
//! to the configured account and its token is still accepted, and falls back
//! to a password login otherwise. A store sealed under a different key is
//! unreadable and treated as absent. The sync cursor is persisted after every
//! processed batch.

mod api;
mod content;

use async_trait::async_trait;
use chrono::Utc;
use informant_core::{
    ContentUri, EventHandler, EventHandlers, EventId, MediaMessage, NetworkSession, RoomId,
    SessionError, SessionResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MatrixConfig;
use crate::store::{SessionStore, StoredSession};
pub use api::ApiClient;

/// Logged-in Matrix account
pub struct MatrixSession {
    api: ApiClient,
    config: MatrixConfig,
    user_id: String,
    device_id: String,
    store: SessionStore,
    state: Mutex<StoredSession>,
    handlers: EventHandlers,
    closed: AtomicBool,
    txn_prefix: String,
    txn_counter: AtomicU64,
}

impl MatrixSession {
    /// Log in, reusing the persisted device when possible
    pub async fn login(config: MatrixConfig) -> SessionResult<Self> {
        let api = ApiClient::new(&config.homeserver, config.request_timeout)?;
        let store = SessionStore::new(&config.store_path, config.store_key.clone());

        let stored = match store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, path = %store.path().display(), "Ignoring unreadable session store");
                None
            }
        };
        let stored = stored.filter(|s| s.belongs_to(&config.homeserver, &config.username));
        let device_hint = stored.as_ref().map(|s| s.device_id.clone());

        let resumed = match stored {
            Some(stored) => Self::resume(&api, stored).await?,
            None => None,
        };
        let was_resumed = resumed.is_some();

        let mut state = match resumed {
            Some(state) => state,
            None => {
                let login = api
                    .login(
                        &config.username,
                        &config.password,
                        device_hint.as_deref(),
                        &config.device_display_name,
                    )
                    .await?;
                api.set_token(login.access_token.clone());

                StoredSession {
                    homeserver: config.homeserver.clone(),
                    username: config.username.clone(),
                    user_id: login.user_id,
                    device_id: login.device_id,
                    access_token: login.access_token,
                    next_batch: None,
                    updated_at: Utc::now(),
                }
            }
        };

        state.updated_at = Utc::now();
        store.save(&state).await?;

        info!(
            user_id = %state.user_id,
            device_id = %state.device_id,
            resumed = was_resumed,
            "Logged in to homeserver"
        );

        Ok(Self {
            api,
            user_id: state.user_id.clone(),
            device_id: state.device_id.clone(),
            config,
            store,
            state: Mutex::new(state),
            handlers: EventHandlers::new(),
            closed: AtomicBool::new(false),
            txn_prefix: uuid::Uuid::new_v4().simple().to_string(),
            txn_counter: AtomicU64::new(0),
        })
    }

    /// Validate a stored token, `None` when a fresh login is needed
    async fn resume(api: &ApiClient, stored: StoredSession) -> SessionResult<Option<StoredSession>> {
        api.set_token(stored.access_token.clone());

        match api.whoami().await {
            Ok(who) if who.user_id == stored.user_id => Ok(Some(stored)),
            Ok(who) => {
                warn!(
                    stored = %stored.user_id,
                    actual = %who.user_id,
                    "Stored token belongs to another account"
                );
                Ok(None)
            }
            Err(e) if e.is_auth_failure() => {
                info!(error_code = e.code(), "Stored access token rejected, logging in again");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Device this session is logged in as
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current sync cursor
    pub fn next_batch(&self) -> Option<String> {
        self.state.lock().next_batch.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{n}", self.txn_prefix)
    }

    async fn sync_loop(&self, shutdown: &CancellationToken) -> SessionResult<()> {
        loop {
            let since = self.next_batch();

            let result = tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                result = self.api.sync(
                    since.as_deref(),
                    self.config.sync_timeout,
                    self.config.sync_request_timeout(),
                ) => result,
            };

            match result {
                Ok(response) => {
                    let next_batch = response.next_batch.clone();
                    for event in response.into_events() {
                        self.handlers.dispatch(self, &event).await;
                    }
                    self.advance(next_batch).await;
                }
                Err(e) if e.is_auth_failure() => return Err(e),
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_ms = self.config.reconnect_delay.as_millis() as u64,
                        "Sync request failed"
                    );
                    tokio::select! {
                        () = shutdown.cancelled() => return Ok(()),
                        () = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                }
            }
        }
    }

    async fn advance(&self, next_batch: String) {
        let snapshot = {
            let mut state = self.state.lock();
            state.next_batch = Some(next_batch);
            state.updated_at = Utc::now();
            state.clone()
        };

        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "Failed to persist sync cursor");
        }
    }
}

#[async_trait]
impl NetworkSession for MatrixSession {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.register(handler);
    }

    async fn run_sync(&self, shutdown: CancellationToken) -> SessionResult<()> {
        info!(user_id = %self.user_id, handlers = self.handlers.len(), "Sync started");

        let result = self.sync_loop(&shutdown).await;
        match &result {
            Ok(()) => info!("Sync stopped"),
            Err(e) => error!(error = %e, error_code = e.code(), "Sync stopped with an error"),
        }
        result
    }

    async fn upload_bytes(&self, data: &[u8], content_type: &str) -> SessionResult<ContentUri> {
        self.ensure_open()?;
        let uri = self.api.upload(data, content_type).await?;
        debug!(uri = %uri, size = data.len(), content_type, "Uploaded media");
        Ok(uri)
    }

    async fn send_text(&self, room_id: &RoomId, text: &str) -> SessionResult<EventId> {
        self.ensure_open()?;
        self.api
            .send_message(room_id, &self.next_txn_id(), &content::text(text))
            .await
    }

    async fn send_media(&self, room_id: &RoomId, media: &MediaMessage) -> SessionResult<EventId> {
        self.ensure_open()?;
        self.api
            .send_message(room_id, &self.next_txn_id(), &content::media(media))
            .await
    }

    async fn join_room(&self, room_id: &RoomId) -> SessionResult<()> {
        self.ensure_open()?;
        self.api.join(room_id).await
    }

    async fn set_display_name(&self, name: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.api.set_display_name(&self.user_id, name).await
    }

    async fn set_avatar(&self, image: &[u8], content_type: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let uri = self.api.upload(image, content_type).await?;
        self.api.set_avatar_url(&self.user_id, &uri).await
    }

    async fn close(&self) -> SessionResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let snapshot = self.state.lock().clone();
        self.store.save(&snapshot).await?;
        info!(path = %self.store.path().display(), "Session store closed");
        Ok(())
    }
}

impl std::fmt::Debug for MatrixSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixSession")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

//! In-memory `NetworkSession` for tests
//!
//! `RecordingSession` records every call in order, can be scripted to fail,
//! and lets a test inject sync events as if they came from the network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::entities::MediaMessage;
use crate::error::{SessionError, SessionResult};
use crate::events::{EventHandler, EventHandlers, SessionEvent};
use crate::traits::NetworkSession;
use crate::value_objects::{ContentUri, EventId, RoomId};

/// One recorded call against the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    SyncStarted,
    SyncStopped,
    Upload { content_type: String, len: usize },
    SendText { room_id: String, text: String },
    SendMedia { room_id: String, media: MediaMessage },
    JoinRoom { room_id: String },
    SetDisplayName { name: String },
    SetAvatar { content_type: String, len: usize },
    Close,
}

impl SessionCall {
    /// Check if the call touches the network on behalf of a submission
    pub fn is_delivery(&self) -> bool {
        matches!(
            self,
            Self::Upload { .. } | Self::SendText { .. } | Self::SendMedia { .. }
        )
    }
}

/// Recording test double
pub struct RecordingSession {
    user_id: String,
    calls: Mutex<Vec<SessionCall>>,
    changed: Notify,
    handlers: EventHandlers,
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
    fail_sends: AtomicBool,
    fail_sync: AtomicBool,
    upload_delay: Mutex<Duration>,
    closed: AtomicBool,
}

impl RecordingSession {
    /// Create a session logged in as `user_id`
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            calls: Mutex::new(Vec::new()),
            changed: Notify::new(),
            handlers: EventHandlers::new(),
            next_id: AtomicU64::new(1),
            fail_uploads: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_sync: AtomicBool::new(false),
            upload_delay: Mutex::new(Duration::ZERO),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a shared session
    pub fn shared(user_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(user_id))
    }

    /// Make every upload fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every text and media send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Make `run_sync` fail immediately
    pub fn fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Hold every upload for `delay` after it is recorded
    pub fn delay_uploads(&self, delay: Duration) {
        *self.upload_delay.lock() = delay;
    }

    /// Snapshot of all recorded calls
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    /// Snapshot of calls made on behalf of submissions
    pub fn delivery_calls(&self) -> Vec<SessionCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.is_delivery())
            .cloned()
            .collect()
    }

    /// Check if `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver an event to the registered handlers, as sync would
    pub async fn emit(&self, event: SessionEvent) {
        self.handlers.dispatch(self, &event).await;
    }

    /// Wait until at least `count` calls matching `filter` were recorded
    pub async fn wait_for<F>(&self, count: usize, timeout: Duration, filter: F) -> bool
    where
        F: Fn(&SessionCall) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            if self.calls.lock().iter().filter(|c| filter(c)).count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.calls.lock().iter().filter(|c| filter(c)).count() >= count;
            }
        }
    }

    /// Wait until at least `count` delivery calls were recorded
    pub async fn wait_for_deliveries(&self, count: usize, timeout: Duration) -> bool {
        self.wait_for(count, timeout, SessionCall::is_delivery).await
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().push(call);
        self.changed.notify_waiters();
    }

    fn next_event_id(&self) -> EventId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        EventId::new(format!("$event{n}"))
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn scripted_failure(flag: &AtomicBool) -> SessionResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(SessionError::Api {
                status: 500,
                errcode: "M_UNKNOWN".to_string(),
                message: "scripted failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NetworkSession for RecordingSession {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.register(handler);
    }

    async fn run_sync(&self, shutdown: CancellationToken) -> SessionResult<()> {
        self.record(SessionCall::SyncStarted);
        if self.fail_sync.load(Ordering::SeqCst) {
            self.record(SessionCall::SyncStopped);
            return Err(SessionError::Api {
                status: 401,
                errcode: "M_UNKNOWN_TOKEN".to_string(),
                message: "scripted sync failure".to_string(),
            });
        }
        shutdown.cancelled().await;
        self.record(SessionCall::SyncStopped);
        Ok(())
    }

    async fn upload_bytes(&self, data: &[u8], content_type: &str) -> SessionResult<ContentUri> {
        self.ensure_open()?;
        self.record(SessionCall::Upload {
            content_type: content_type.to_string(),
            len: data.len(),
        });
        let delay = *self.upload_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Self::scripted_failure(&self.fail_uploads)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ContentUri::new(format!("mxc://test/media{n}")))
    }

    async fn send_text(&self, room_id: &RoomId, text: &str) -> SessionResult<EventId> {
        self.ensure_open()?;
        self.record(SessionCall::SendText {
            room_id: room_id.to_string(),
            text: text.to_string(),
        });
        Self::scripted_failure(&self.fail_sends)?;
        Ok(self.next_event_id())
    }

    async fn send_media(&self, room_id: &RoomId, media: &MediaMessage) -> SessionResult<EventId> {
        self.ensure_open()?;
        self.record(SessionCall::SendMedia {
            room_id: room_id.to_string(),
            media: media.clone(),
        });
        Self::scripted_failure(&self.fail_sends)?;
        Ok(self.next_event_id())
    }

    async fn join_room(&self, room_id: &RoomId) -> SessionResult<()> {
        self.ensure_open()?;
        self.record(SessionCall::JoinRoom {
            room_id: room_id.to_string(),
        });
        Ok(())
    }

    async fn set_display_name(&self, name: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.record(SessionCall::SetDisplayName {
            name: name.to_string(),
        });
        Ok(())
    }

    async fn set_avatar(&self, image: &[u8], content_type: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.record(SessionCall::SetAvatar {
            content_type: content_type.to_string(),
            len: image.len(),
        });
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.record(SessionCall::Close);
        Ok(())
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("user_id", &self.user_id)
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

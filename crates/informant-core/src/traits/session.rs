//! Network session port
//!
//! A `NetworkSession` is a logged-in connection to the messaging network.
//! The lifecycle owns it; the dispatch loop and event handlers only borrow it.
//! Implementations must tolerate concurrent use from the sync task (read
//! path) and the dispatch loop (write path).

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::entities::MediaMessage;
use crate::error::SessionResult;
use crate::events::EventHandler;
use crate::value_objects::{ContentUri, EventId, RoomId};

#[async_trait]
pub trait NetworkSession: Send + Sync {
    /// Fully qualified id of the logged-in account
    fn user_id(&self) -> &str;

    /// Register a handler for events produced by `run_sync`
    fn add_event_handler(&self, handler: Arc<dyn EventHandler>);

    /// Receive events until `shutdown` is cancelled
    ///
    /// Returns `Ok(())` on cancellation and an error when sync cannot continue.
    async fn run_sync(&self, shutdown: CancellationToken) -> SessionResult<()>;

    /// Upload a binary payload, returning where it can be referenced from
    async fn upload_bytes(&self, data: &[u8], content_type: &str) -> SessionResult<ContentUri>;

    /// Send a plain text message
    async fn send_text(&self, room_id: &RoomId, text: &str) -> SessionResult<EventId>;

    /// Send a message referencing uploaded media
    async fn send_media(&self, room_id: &RoomId, media: &MediaMessage) -> SessionResult<EventId>;

    /// Join a room the account was invited to
    async fn join_room(&self, room_id: &RoomId) -> SessionResult<()>;

    /// Set the account display name
    async fn set_display_name(&self, name: &str) -> SessionResult<()>;

    /// Upload an image and use it as the account avatar
    async fn set_avatar(&self, image: &[u8], content_type: &str) -> SessionResult<()>;

    /// Release persistent session storage
    async fn close(&self) -> SessionResult<()>;
}

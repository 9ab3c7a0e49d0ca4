//! Session events - what background sync surfaces to the rest of the process
//!
//! Handlers are registered explicitly against a `NetworkSession` at startup
//! and receive every event the sync loop produces.

mod handler;
mod session_event;

pub use handler::{EventHandler, EventHandlers};
pub use session_event::{InviteEvent, RoomMessageEvent, SessionEvent};

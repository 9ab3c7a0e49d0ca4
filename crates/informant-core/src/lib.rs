//! # informant-core
//!
//! Domain layer containing the submission entity, session events, and the
//! `NetworkSession` port that every messaging backend implements.
//! This crate has no dependency on the HTTP stack or on any concrete backend.

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use entities::{MediaKind, MediaMessage, Submission};
pub use error::{SessionError, SessionResult};
pub use events::{EventHandler, EventHandlers, SessionEvent};
pub use traits::NetworkSession;
pub use value_objects::{ContentUri, EventId, RoomId};

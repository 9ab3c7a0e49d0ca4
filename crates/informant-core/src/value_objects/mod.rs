//! Value objects - identifiers handed out by the messaging network

mod ids;

pub use ids::{ContentUri, EventId, RoomId};

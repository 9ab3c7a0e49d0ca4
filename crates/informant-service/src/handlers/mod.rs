//! Session event handlers registered at startup

mod invite;
mod message_logger;

pub use invite::InviteHandler;
pub use message_logger::MessageLogger;

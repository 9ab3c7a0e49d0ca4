//! Port traits - what the core needs from the messaging network

mod session;

pub use session::NetworkSession;

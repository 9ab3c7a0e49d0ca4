//! # informant-service
//!
//! Application layer: the dispatch loop that relays submissions to the
//! network session, the handlers reacting to sync events, and best-effort
//! profile setup.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod profile;

pub use dispatch::{Delivery, DispatchOutcome, DispatchPolicy, Dispatcher};
pub use error::{ServiceError, ServiceResult};
pub use handlers::{InviteHandler, MessageLogger};
pub use profile::{apply_profile, ProfileSettings};

//! Dispatch loop
//!
//! Serially drains the hand-off channel and relays each authorized
//! submission through the network session.

mod dispatcher;
mod policy;

pub use dispatcher::{Delivery, DispatchOutcome, Dispatcher};
pub use policy::DispatchPolicy;

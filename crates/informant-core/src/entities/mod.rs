//! Domain entities

mod media;
mod submission;

pub use media::{MediaKind, MediaMessage};
pub use submission::Submission;

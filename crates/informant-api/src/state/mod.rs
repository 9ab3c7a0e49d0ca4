//! Intake state
//!
//! Every request handler holds a clone of the hand-off channel sender.

use informant_core::Submission;
use tokio::sync::mpsc;

/// State shared across intake handlers
#[derive(Debug, Clone)]
pub struct IntakeState {
    sender: mpsc::Sender<Submission>,
}

impl IntakeState {
    pub fn new(sender: mpsc::Sender<Submission>) -> Self {
        Self { sender }
    }

    /// Producer side of the hand-off channel
    pub fn sender(&self) -> &mpsc::Sender<Submission> {
        &self.sender
    }
}

//! Submission webhook
//!
//! Accepts any method on any path. The caller always gets the default empty
//! 200: parse failures are only logged, and the PSK check happens later in
//! the dispatch loop.

use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State};
use informant_core::Submission;
use tracing::{debug, warn};

use crate::state::IntakeState;

/// Parse the body and hand the submission to the dispatch loop
///
/// Waits while the hand-off channel is full.
pub async fn receive(State(state): State<IntakeState>, body: Result<Bytes, BytesRejection>) {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return;
        }
    };

    let submission = match Submission::from_json(&body) {
        Ok(submission) => submission,
        Err(e) => {
            warn!(error = %e, size = body.len(), "Failed to parse submission");
            return;
        }
    };

    debug!(
        room_id = %submission.channel,
        has_content = submission.has_content(),
        has_message = submission.has_message(),
        "Submission received"
    );

    if state.sender().send(submission).await.is_err() {
        warn!("Dispatch loop has stopped, dropping submission");
    }
}

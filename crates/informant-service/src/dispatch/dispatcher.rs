use informant_common::SharedSecret;
use informant_core::{MediaMessage, NetworkSession, RoomId, Submission};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument, Span};

use super::DispatchPolicy;

/// Result of one network call made on behalf of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Nothing to send
    #[default]
    Skipped,
    Sent,
    Failed,
}

/// What happened to one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    pub authorized: bool,
    pub media: Delivery,
    pub text: Delivery,
}

impl DispatchOutcome {
    fn rejected() -> Self {
        Self::default()
    }
}

/// Single consumer of the hand-off channel
pub struct Dispatcher {
    session: Arc<dyn NetworkSession>,
    gate: SharedSecret,
    policy: DispatchPolicy,
    span: Span,
}

impl Dispatcher {
    /// Create a dispatcher relaying through `session`
    pub fn new(session: Arc<dyn NetworkSession>, gate: SharedSecret, policy: DispatchPolicy) -> Self {
        Self {
            session,
            gate,
            policy,
            span: tracing::info_span!("dispatch"),
        }
    }

    /// Attach log output to `span` instead of the default `dispatch` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Run until `shutdown` is cancelled or every sender is dropped
    ///
    /// Submissions still queued when the loop ends are dropped with the
    /// receiver, and producers blocked on a full channel observe it closed.
    pub async fn run(&self, mut rx: mpsc::Receiver<Submission>, shutdown: CancellationToken) {
        async {
            info!(
                send_interval_ms = self.policy.send_interval.as_millis() as u64,
                "Dispatch loop started"
            );

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        info!("Shutdown requested, leaving dispatch loop");
                        break;
                    }
                    received = rx.recv() => {
                        let Some(submission) = received else {
                            info!("Hand-off channel closed, leaving dispatch loop");
                            break;
                        };

                        self.process(submission).await;

                        if !self.pause(&shutdown).await {
                            info!("Shutdown requested, leaving dispatch loop");
                            break;
                        }
                    }
                }
            }
        }
        .instrument(self.span.clone())
        .await;
    }

    /// Gate and deliver one submission
    ///
    /// Media goes first, then text. Each half is attempted independently
    /// and every failure is logged and swallowed.
    pub async fn process(&self, submission: Submission) -> DispatchOutcome {
        if !self.gate.authorizes(submission.psk.as_bytes()) {
            return DispatchOutcome::rejected();
        }

        let room = submission.room_id();
        let mut outcome = DispatchOutcome {
            authorized: true,
            ..DispatchOutcome::default()
        };

        if submission.has_content() {
            outcome.media = self.deliver_media(&room, &submission).await;
        }
        if submission.has_message() {
            outcome.text = self.deliver_text(&room, &submission.message).await;
        }

        outcome
    }

    async fn deliver_media(&self, room: &RoomId, submission: &Submission) -> Delivery {
        let size = submission.content_bytes.len();
        let location = match self
            .session
            .upload_bytes(&submission.content_bytes, &submission.content_type)
            .await
        {
            Ok(location) => location,
            Err(e) => {
                error!(
                    room_id = %room,
                    content_type = %submission.content_type,
                    size,
                    error = %e,
                    "Upload failed, skipping media message"
                );
                return Delivery::Failed;
            }
        };

        let media = MediaMessage::new(
            location,
            submission.content_type.clone(),
            submission.caption.clone(),
            size,
        );

        match self.session.send_media(room, &media).await {
            Ok(event_id) => {
                info!(room_id = %room, event_id = %event_id, kind = ?media.kind, "Media message sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(room_id = %room, error = %e, "Failed to send media message");
                Delivery::Failed
            }
        }
    }

    async fn deliver_text(&self, room: &RoomId, text: &str) -> Delivery {
        match self.session.send_text(room, text).await {
            Ok(event_id) => {
                info!(room_id = %room, event_id = %event_id, "Text message sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(room_id = %room, error = %e, "Failed to send text message");
                Delivery::Failed
            }
        }
    }

    /// Wait out the send interval. Returns false if shutdown came first.
    async fn pause(&self, shutdown: &CancellationToken) -> bool {
        if self.policy.send_interval.is_zero() {
            return !shutdown.is_cancelled();
        }

        debug!(
            send_interval_ms = self.policy.send_interval.as_millis() as u64,
            "Pausing before next submission"
        );
        tokio::select! {
            () = shutdown.cancelled() => false,
            () = tokio::time::sleep(self.policy.send_interval) => true,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("user_id", &self.session.user_id())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use informant_core::testing::{RecordingSession, SessionCall};
    use informant_core::MediaKind;
    use std::time::Duration;

    const SECRET: &str = "secret";

    fn dispatcher(session: &Arc<RecordingSession>) -> Dispatcher {
        Dispatcher::new(
            session.clone(),
            SharedSecret::new(SECRET),
            DispatchPolicy::immediate(),
        )
    }

    fn send_text(room: &str, text: &str) -> SessionCall {
        SessionCall::SendText {
            room_id: room.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_wrong_psk_makes_no_calls() {
        let session = RecordingSession::shared("@bot:x");
        let outcome = dispatcher(&session)
            .process(
                Submission::text("!r:x", "hi", "wrong")
                    .with_content(b"abc".to_vec(), "image/png", "cap"),
            )
            .await;

        assert!(!outcome.authorized);
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_text_only() {
        let session = RecordingSession::shared("@bot:x");
        let outcome = dispatcher(&session)
            .process(Submission::text("!room:example.org", "hello", SECRET))
            .await;

        assert_eq!(session.calls(), vec![send_text("!room:example.org", "hello")]);
        assert_eq!(outcome.media, Delivery::Skipped);
        assert_eq!(outcome.text, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_media_then_text_in_order() {
        let session = RecordingSession::shared("@bot:x");
        let submission = Submission::text("!r:x", "see attached", SECRET).with_content(
            vec![1, 2, 3, 4],
            "image/png",
            "graph",
        );

        let outcome = dispatcher(&session).process(submission).await;
        let calls = session.calls();

        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            SessionCall::Upload {
                content_type: "image/png".to_string(),
                len: 4
            }
        );
        let SessionCall::SendMedia { room_id, media } = &calls[1] else {
            panic!("expected media send, got {:?}", calls[1]);
        };
        assert_eq!(room_id, "!r:x");
        assert_eq!(media.caption, "graph");
        assert_eq!(media.size, 4);
        assert_eq!(media.kind, MediaKind::Image);
        assert!(media.location.as_str().starts_with("mxc://"));
        assert_eq!(calls[2], send_text("!r:x", "see attached"));
        assert_eq!(outcome.media, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_upload_failure_skips_media_but_sends_text() {
        let session = RecordingSession::shared("@bot:x");
        session.fail_uploads(true);
        let submission =
            Submission::text("!r:x", "fallback", SECRET).with_content(vec![9; 8], "video/mp4", "");

        let outcome = dispatcher(&session).process(submission).await;

        assert!(!session
            .calls()
            .iter()
            .any(|c| matches!(c, SessionCall::SendMedia { .. })));
        assert_eq!(session.calls().last(), Some(&send_text("!r:x", "fallback")));
        assert_eq!(outcome.media, Delivery::Failed);
        assert_eq!(outcome.text, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let session = RecordingSession::shared("@bot:x");
        session.fail_sends(true);

        let outcome = dispatcher(&session)
            .process(Submission::text("!r:x", "hi", SECRET))
            .await;

        assert_eq!(outcome.text, Delivery::Failed);
    }

    #[tokio::test]
    async fn test_empty_submission_makes_no_calls() {
        let session = RecordingSession::shared("@bot:x");
        let outcome = dispatcher(&session)
            .process(Submission::text("!r:x", "", SECRET))
            .await;

        assert!(outcome.authorized);
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_is_fifo() {
        let session = RecordingSession::shared("@bot:x");
        let dispatcher = dispatcher(&session);
        let (tx, rx) = mpsc::channel(4);

        tx.send(Submission::text("!r:x", "A", SECRET)).await.unwrap();
        tx.send(Submission::text("!r:x", "B", SECRET)).await.unwrap();
        drop(tx);

        dispatcher.run(rx, CancellationToken::new()).await;

        assert_eq!(
            session.calls(),
            vec![send_text("!r:x", "A"), send_text("!r:x", "B")]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel_and_abandons_queue() {
        let session = RecordingSession::shared("@bot:x");
        let dispatcher = dispatcher(&session);
        let (tx, rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        token.cancel();

        // Only the shutdown branch can win once the queue is empty
        tokio::time::timeout(Duration::from_secs(1), dispatcher.run(rx, token))
            .await
            .unwrap();

        assert!(tx.send(Submission::text("!r:x", "late", SECRET)).await.is_err());
        assert!(session.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_interval_paces_submissions() {
        let session = RecordingSession::shared("@bot:x");
        let dispatcher = Dispatcher::new(
            session.clone(),
            SharedSecret::new(SECRET),
            DispatchPolicy::new(Duration::from_millis(250)),
        );
        let (tx, rx) = mpsc::channel(4);
        tx.send(Submission::text("!r:x", "A", SECRET)).await.unwrap();
        tx.send(Submission::text("!r:x", "B", SECRET)).await.unwrap();
        drop(tx);

        let started = tokio::time::Instant::now();
        dispatcher.run(rx, CancellationToken::new()).await;

        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(session.delivery_calls().len(), 2);
    }
}

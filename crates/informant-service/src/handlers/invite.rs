//! Auto-join on invite

use async_trait::async_trait;
use informant_core::{EventHandler, NetworkSession, SessionEvent};
use tracing::{error, info, Instrument, Span};

/// Joins every room this account is invited to
pub struct InviteHandler {
    span: Span,
}

impl InviteHandler {
    pub fn new() -> Self {
        Self {
            span: tracing::info_span!("invite"),
        }
    }

    pub fn with_span(span: Span) -> Self {
        Self { span }
    }
}

impl Default for InviteHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for InviteHandler {
    fn name(&self) -> &'static str {
        "invite"
    }

    async fn handle(&self, session: &dyn NetworkSession, event: &SessionEvent) {
        let SessionEvent::MemberInvited(invite) = event else {
            return;
        };
        // Invites for other members show up in shared rooms too
        if !invite.targets(session.user_id()) {
            return;
        }

        async {
            match session.join_room(&invite.room_id).await {
                Ok(()) => info!(room_id = %invite.room_id, inviter = %invite.inviter, "Joined room"),
                Err(e) => error!(room_id = %invite.room_id, error = %e, "Failed to join room"),
            }
        }
        .instrument(self.span.clone())
        .await;
    }
}

use async_trait::async_trait;
use informant_core::{EventHandler, NetworkSession, SessionEvent};
use tracing::debug;

/// Logs room messages seen by sync at DEBUG
#[derive(Debug, Default)]
pub struct MessageLogger;

#[async_trait]
impl EventHandler for MessageLogger {
    fn name(&self) -> &'static str {
        "message_logger"
    }

    async fn handle(&self, _session: &dyn NetworkSession, event: &SessionEvent) {
        if let SessionEvent::MessageReceived(message) = event {
            debug!(
                room_id = %message.room_id,
                sender = %message.sender,
                event_id = ?message.event_id,
                msgtype = %message.msgtype,
                body = %message.body,
                "Received message"
            );
        }
    }
}

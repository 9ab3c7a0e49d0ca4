use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use super::SessionEvent;
use crate::traits::NetworkSession;

/// Reacts to events produced by background sync
///
/// Handlers run inline on the sync task, so a slow handler delays the next
/// sync request. Failures are the handler's own business to log.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &'static str;

    /// Handle one event. `session` is the session that produced it.
    async fn handle(&self, session: &dyn NetworkSession, event: &SessionEvent);
}

/// Ordered set of registered handlers
#[derive(Default)]
pub struct EventHandlers {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventHandlers {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in registration order.
    pub fn register(&self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(handler = handler.name(), "Registered event handler");
        self.handlers.write().push(handler);
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Check if no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Deliver an event to every handler
    pub async fn dispatch(&self, session: &dyn NetworkSession, event: &SessionEvent) {
        // Snapshot so the lock is not held across awaits
        let handlers: Vec<Arc<dyn EventHandler>> = self.handlers.read().clone();

        for handler in handlers {
            tracing::trace!(
                handler = handler.name(),
                event_type = event.event_type(),
                "Dispatching session event"
            );
            handler.handle(session, event).await;
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.handlers.read().iter().map(|h| h.name()).collect();
        f.debug_struct("EventHandlers").field("handlers", &names).finish()
    }
}

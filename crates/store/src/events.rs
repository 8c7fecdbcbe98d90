use {tokio::sync::broadcast, tracing::debug};

use crate::entry::LogEntry;

/// Change notification published by the store after a mutation is persisted.
///
/// Events are published in write order; receivers that fall behind observe
/// `RecvError::Lagged` and should re-read the store instead of replaying.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    LogAppended(LogEntry),
    UnreadChanged(u64),
}

/// Broadcast fan-out from the store to every attached view.
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Publish to all current subscribers. A send error only means nobody is
    /// listening, which is fine.
    pub fn publish(&self, event: StoreEvent) {
        let receivers = self.tx.receiver_count();
        debug!(receivers, event = event_name(&event), "store event");
        let _ = self.tx.send(event);
    }
}

fn event_name(event: &StoreEvent) -> &'static str {
    match event {
        StoreEvent::LogAppended(_) => "log.appended",
        StoreEvent::UnreadChanged(_) => "unread.changed",
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(StoreEvent::UnreadChanged(1));
        bus.publish(StoreEvent::UnreadChanged(2));

        assert!(matches!(
            rx.recv().await.unwrap(),
            StoreEvent::UnreadChanged(1)
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            StoreEvent::UnreadChanged(2)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = EventBus::new(16);
        bus.publish(StoreEvent::UnreadChanged(0));
    }
}

//! Change feed for observing committed store writes.
//!
//! The feed drives live queries: each committed write emits one event per
//! touched row, in commit order, to every subscriber. Subscribers whose
//! receiver was dropped are pruned on the next emit.

use crate::id::{EntityId, OwnerId};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Type of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// Row was inserted (no previous version existed).
    Insert,
    /// Row was replaced.
    Update,
    /// Row was deleted.
    Delete,
    /// Row's sync flag flipped to true; the payload is unchanged.
    Synced,
}

/// A single change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Sequence of the write that produced the event.
    pub sequence: u64,
    /// Table of the row.
    pub table: String,
    /// Row id.
    pub entity_id: EntityId,
    /// Owner of the row.
    pub owner_id: OwnerId,
    /// What happened.
    pub change_type: ChangeType,
}

/// Distributes committed changes to subscribers.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<UnboundedSender<ChangeEvent>>>,
}

impl ChangeFeed {
    /// Creates a change feed with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Emits the events of one committed write.
    ///
    /// Called by the store while it still holds its writer lock, so
    /// subscribers observe writes in the order they were committed.
    pub fn emit_batch(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| events.iter().all(|event| tx.send(event.clone()).is_ok()));
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64, id: &str) -> ChangeEvent {
        ChangeEvent {
            sequence,
            table: "wallets".into(),
            entity_id: EntityId::from(id),
            owner_id: OwnerId::new("u1"),
            change_type: ChangeType::Insert,
        }
    }

    #[test]
    fn events_arrive_in_order() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.emit_batch(&[event(1, "a"), event(1, "b")]);
        feed.emit_batch(&[event(2, "c")]);

        let ids: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.entity_id.to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn every_subscriber_gets_a_copy() {
        let feed = ChangeFeed::new();
        let mut rx1 = feed.subscribe();
        let mut rx2 = feed.subscribe();

        feed.emit_batch(&[event(1, "a")]);

        assert_eq!(rx1.try_recv().unwrap(), event(1, "a"));
        assert_eq!(rx2.try_recv().unwrap(), event(1, "a"));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit_batch(&[event(1, "a")]);
        assert_eq!(feed.subscriber_count(), 0);
    }
}

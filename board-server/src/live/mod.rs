//! BoardRelay, per-board fan-out of committed changes
//!
//! ```text
//! MoveCoordinator / handlers (after commit)
//!       │ publish(board_id, BoardEvent, origin)
//!       ▼
//! BoardRelay
//!   ├── observers: observer_id → mpsc::Sender<RelayMessage> (bounded)
//!   ├── boards:    board_id → {observer_id}
//!   └── joined:    observer_id → {board_id}
//!         │
//!         ▼
//!   WS session (one per observer) → socket
//! ```
//!
//! Delivery is at-most-once: a full observer buffer drops the message and the
//! observer recovers through the version gap on its next event.

use dashmap::{DashMap, DashSet};
use shared::relay::{BoardEvent, ObserverId, RelayMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Clone)]
pub struct BoardRelay {
    inner: Arc<Registry>,
    buffer: usize,
}

#[derive(Default)]
struct Registry {
    observers: DashMap<ObserverId, mpsc::Sender<RelayMessage>>,
    boards: DashMap<i64, DashSet<ObserverId>>,
    joined: DashMap<ObserverId, DashSet<i64>>,
}

impl BoardRelay {
    /// `buffer` is the per-observer queue length
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Registry::default()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new observer and return its id and message queue
    pub fn register(&self) -> (ObserverId, mpsc::Receiver<RelayMessage>) {
        let observer_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.inner.observers.insert(observer_id.clone(), tx);
        tracing::debug!(observer_id = %observer_id, "Relay observer registered");
        (observer_id, rx)
    }

    /// Forget an observer and all of its board memberships
    pub fn deregister(&self, observer_id: &str) {
        self.inner.observers.remove(observer_id);
        if let Some((_, boards)) = self.inner.joined.remove(observer_id) {
            for board_id in boards.iter() {
                self.detach(*board_id, observer_id);
            }
        }
        tracing::debug!(observer_id = %observer_id, "Relay observer deregistered");
    }

    /// Join an observer to a board; returns false for an unknown observer
    pub fn subscribe(&self, observer_id: &str, board_id: i64) -> bool {
        if !self.inner.observers.contains_key(observer_id) {
            return false;
        }
        self.inner
            .boards
            .entry(board_id)
            .or_default()
            .insert(observer_id.to_string());
        self.inner
            .joined
            .entry(observer_id.to_string())
            .or_default()
            .insert(board_id);
        true
    }

    /// Leave a board; idempotent
    pub fn unsubscribe(&self, observer_id: &str, board_id: i64) {
        if let Some(boards) = self.inner.joined.get(observer_id) {
            boards.remove(&board_id);
        }
        self.detach(board_id, observer_id);
    }

    /// Deliver `event` to every observer of its board except `origin`
    ///
    /// Never fails; returns how many observers accepted the message.
    pub fn publish(&self, event: BoardEvent, origin: Option<&str>) -> usize {
        let board_id = event.board_id();
        let targets: Vec<ObserverId> = match self.inner.boards.get(&board_id) {
            Some(set) => set
                .iter()
                .filter(|id| Some(id.as_str()) != origin)
                .map(|id| id.key().clone())
                .collect(),
            None => return 0,
        };

        let kind = event.kind();
        let version = event.version();
        let msg = RelayMessage::Event { event };
        let mut delivered = 0;
        let mut closed = Vec::new();

        for observer_id in targets {
            let Some(tx) = self
                .inner
                .observers
                .get(&observer_id)
                .map(|tx| tx.value().clone())
            else {
                closed.push(observer_id);
                continue;
            };
            match tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        observer_id = %observer_id,
                        board_id,
                        event = kind,
                        version,
                        "Relay buffer full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(observer_id),
            }
        }

        for observer_id in closed {
            self.deregister(&observer_id);
        }

        tracing::debug!(board_id, event = kind, version, delivered, "Relay publish");
        delivered
    }

    /// Observers currently joined to a board
    #[cfg(test)]
    pub(crate) fn subscriber_count(&self, board_id: i64) -> usize {
        self.inner.boards.get(&board_id).map_or(0, |s| s.len())
    }

    fn detach(&self, board_id: i64, observer_id: &str) {
        if let Some(set) = self.inner.boards.get(&board_id) {
            set.remove(observer_id);
        }
        // Drop empty board entries so the registry does not grow with history
        self.inner
            .boards
            .remove_if(&board_id, |_, set| set.is_empty());
    }
}

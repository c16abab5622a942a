use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use super::node::NodeKey;

/// One batch of expansion changes, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionChange {
    pub added: Vec<NodeKey>,
    pub removed: Vec<NodeKey>,
}

impl ExpansionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Default)]
struct TrackerInner {
    /// Insertion order is kept so `clear` reports removals oldest first.
    expanded: Vec<NodeKey>,
    subscribers: Vec<mpsc::UnboundedSender<ExpansionChange>>,
}

/// Which nodes the user has expanded.
///
/// Cloning shares the same set. Every effective mutation is pushed to all live
/// subscribers; no-op calls emit nothing.
#[derive(Clone, Default)]
pub struct ExpansionTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl ExpansionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ExpansionChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.lock().expanded.contains(key)
    }

    pub fn expanded(&self) -> Vec<NodeKey> {
        self.lock().expanded.clone()
    }

    pub fn expand(&self, key: NodeKey) {
        self.expand_many([key]);
    }

    pub fn collapse(&self, key: &NodeKey) {
        self.collapse_many([key.clone()]);
    }

    pub fn toggle(&self, key: NodeKey) {
        if self.is_expanded(&key) {
            self.collapse(&key);
        } else {
            self.expand(key);
        }
    }

    pub fn expand_many(&self, keys: impl IntoIterator<Item = NodeKey>) {
        let mut inner = self.lock();
        let mut change = ExpansionChange::default();
        for key in keys {
            if !inner.expanded.contains(&key) {
                inner.expanded.push(key.clone());
                change.added.push(key);
            }
        }
        inner.publish(change);
    }

    pub fn collapse_many(&self, keys: impl IntoIterator<Item = NodeKey>) {
        let mut inner = self.lock();
        let mut change = ExpansionChange::default();
        for key in keys {
            if let Some(pos) = inner.expanded.iter().position(|k| *k == key) {
                inner.expanded.remove(pos);
                change.removed.push(key);
            }
        }
        inner.publish(change);
    }

    /// Collapse everything in one batch.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let removed = std::mem::take(&mut inner.expanded);
        inner.publish(ExpansionChange {
            added: Vec::new(),
            removed,
        });
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrackerInner {
    fn publish(&mut self, change: ExpansionChange) {
        if change.is_empty() {
            return;
        }
        self.subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

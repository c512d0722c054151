//! Thread-safe FIFO of pending (key, document) pairs.
//!
//! The queue sits between the synchronous write path and the flush
//! scheduler. Enqueue is a fast, lock-protected operation with no I/O, so
//! producers never stall on the network; the scheduler drains by taking a
//! snapshot of whatever is queued at cycle start.
//!
//! # Snapshot semantics
//!
//! [`IngestionQueue::take_snapshot`] captures the queue length N under the
//! lock and removes exactly N items. Items enqueued while a drain cycle is
//! processing its snapshot stay queued for the next cycle: never lost,
//! never double-processed.
//!
//! # Capacity
//!
//! The backing deque is created with a capacity hint
//! ([`QUEUE_CAPACITY_HINT`](crate::constants::QUEUE_CAPACITY_HINT)) but
//! there is no enforced upper bound. If store throughput cannot keep up
//! with ingestion, the queue grows without limit; that is the contract.
//!
//! The queue's own lock is independent from the scheduler's drain
//! exclusivity, which is what lets ingestion proceed uninterrupted while a
//! drain is in flight.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::constants::QUEUE_CAPACITY_HINT;

/// One (key, document) pair produced by the document builder, consumed
/// exactly once by a drain cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    /// Key the document is stored under.
    pub key: String,
    /// The document value to persist.
    pub document: Value,
}

/// Thread-safe FIFO holding pending items until the next drain cycle.
#[derive(Debug, Default)]
pub struct IngestionQueue {
    items: Mutex<VecDeque<PendingItem>>,
}

impl IngestionQueue {
    /// Creates an empty queue with the standard capacity hint.
    #[must_use]
    pub fn new() -> Self {
        IngestionQueue {
            items: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY_HINT)),
        }
    }

    /// Appends one item. Never blocks on I/O and never rejects.
    pub fn enqueue(&self, item: PendingItem) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    /// Removes and returns exactly the items present right now, FIFO.
    ///
    /// Concurrent enqueues are unaffected: anything added after the
    /// length is read lands behind the snapshot and stays queued.
    #[must_use]
    pub fn take_snapshot(&self) -> Vec<PendingItem> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let count = items.len();
        items.drain(..count).collect()
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn item(key: &str) -> PendingItem {
        PendingItem {
            key: key.to_string(),
            document: json!({"key": key}),
        }
    }

    #[test]
    fn snapshot_preserves_fifo_order() {
        let queue = IngestionQueue::new();
        queue.enqueue(item("a"));
        queue.enqueue(item("b"));
        queue.enqueue(item("c"));

        let snapshot = queue.take_snapshot();
        let keys: Vec<&str> = snapshot.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_of_empty_queue_is_empty() {
        let queue = IngestionQueue::new();
        assert!(queue.take_snapshot().is_empty());
    }

    #[test]
    fn items_enqueued_after_snapshot_wait_for_the_next_one() {
        let queue = IngestionQueue::new();
        queue.enqueue(item("first"));
        queue.enqueue(item("second"));

        let first_cycle = queue.take_snapshot();
        assert_eq!(first_cycle.len(), 2);

        // Arrives while the first snapshot is still being processed.
        queue.enqueue(item("late"));
        assert_eq!(queue.len(), 1);

        let second_cycle = queue.take_snapshot();
        assert_eq!(second_cycle.len(), 1);
        assert_eq!(second_cycle[0].key, "late");
    }

    #[test]
    fn accepts_enqueues_past_the_capacity_hint() {
        let queue = IngestionQueue::new();
        let total = QUEUE_CAPACITY_HINT + 10_000;
        for i in 0..total {
            queue.enqueue(PendingItem {
                key: format!("k{i}"),
                document: Value::Null,
            });
        }
        assert_eq!(queue.len(), total);
        assert_eq!(queue.take_snapshot().len(), total);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(IngestionQueue::new());
        let mut handles = Vec::new();
        for producer in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                for i in 0..1_000 {
                    queue.enqueue(PendingItem {
                        key: format!("p{producer}-{i}"),
                        document: Value::Null,
                    });
                }
            }));
        }
        for handle in handles {
            handle.join().expect("producer thread panicked");
        }

        assert_eq!(queue.len(), 8_000);
        let snapshot = queue.take_snapshot();
        assert_eq!(snapshot.len(), 8_000);
        let unique: std::collections::HashSet<&str> =
            snapshot.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(unique.len(), 8_000);
    }
}

//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Runtime helpers supporting the orchestrator."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

/// Capacity of one pending-event batch. When full, producers receive
/// [`BatchFull`] and retry after the next drain.
pub const BATCH_CAPACITY: usize = 64;

/// The batch is saturated; the producer owns backpressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event batch is full; retry after the next tick")]
pub struct BatchFull;

/// One pending external event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    /// Monotonically assigned by the batch, tie-breaks equal timestamps.
    pub event_id: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

/// Fixed-capacity multi-producer batch of pending events, drained exactly
/// once per tick by the owning worker.
///
/// The drain sorts by `(timestamp, event_id)` so causal order survives
/// producer contention.
#[derive(Debug)]
pub struct EventBatch<T> {
    entries: Mutex<Vec<Event<T>>>,
    next_event_id: AtomicU64,
}

impl<T> Default for EventBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBatch<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(BATCH_CAPACITY)),
            next_event_id: AtomicU64::new(0),
        }
    }

    /// Append an event stamped with the given timestamp. Returns the assigned
    /// event id.
    pub fn push(&self, timestamp: DateTime<Utc>, payload: T) -> Result<u64, BatchFull> {
        let mut entries = self.entries.lock();
        if entries.len() >= BATCH_CAPACITY {
            return Err(BatchFull);
        }
        let event_id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        entries.push(Event {
            event_id,
            timestamp,
            payload,
        });
        Ok(event_id)
    }

    /// Take every pending event in causal order.
    pub fn drain(&self) -> Vec<Event<T>> {
        let mut entries = std::mem::take(&mut *self.entries.lock());
        entries.sort_by_key(|event| (event.timestamp, event.event_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn drain_orders_by_timestamp_then_event_id() {
        let batch: EventBatch<&'static str> = EventBatch::new();
        batch.push(at(20), "later").unwrap();
        batch.push(at(10), "earlier").unwrap();
        batch.push(at(10), "earlier-second").unwrap();
        let drained = batch.drain();
        let payloads: Vec<_> = drained.iter().map(|e| e.payload).collect();
        assert_eq!(payloads, vec!["earlier", "earlier-second", "later"]);
        assert!(drained[0].event_id < drained[1].event_id);
    }

    #[test]
    fn push_fails_when_full_and_recovers_after_drain() {
        let batch: EventBatch<u32> = EventBatch::new();
        for i in 0..BATCH_CAPACITY as u32 {
            batch.push(at(0), i).unwrap();
        }
        assert_eq!(batch.push(at(0), 999), Err(BatchFull));
        let drained = batch.drain();
        assert_eq!(drained.len(), BATCH_CAPACITY);
        batch.push(at(1), 1000).unwrap();
    }

    #[test]
    fn event_ids_stay_monotonic_across_drains() {
        let batch: EventBatch<u32> = EventBatch::new();
        let a = batch.push(at(0), 1).unwrap();
        batch.drain();
        let b = batch.push(at(0), 2).unwrap();
        assert!(b > a);
    }
}

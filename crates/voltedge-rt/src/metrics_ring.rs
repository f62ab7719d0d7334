//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Runtime helpers supporting the orchestrator."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Bounded single-producer/single-consumer ring for snapshot and metric
//! samples.
//!
//! Indices are monotonically increasing u64 positions; the slot for position
//! `p` is `p & mask`. Each slot carries its own sequence word:
//!
//! * `seq == p`      — free for the writer of position `p`
//! * `seq == p + 1`  — written at `p`, ready for the reader
//! * after a read at `p`, the slot is released as `seq = p + capacity`
//!
//! On overflow the producer reclaims the oldest unread entry (advancing
//! `head` itself) and writes the new one, preserving fresh-state bias for
//! monitoring consumers. All hand-offs use release/acquire pairs on the slot
//! sequences, so the consumer observes entries strictly in push order.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Result of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored without displacing anything.
    Stored,
    /// The ring was full; the oldest unread entry was dropped.
    Overwrote,
}

struct Slot<T> {
    seq: AtomicU64,
    value: UnsafeCell<Option<T>>,
}

struct RingInner<T> {
    mask: u64,
    capacity: u64,
    head: AtomicU64,
    tail: AtomicU64,
    overwrites: AtomicU64,
    slots: Box<[Slot<T>]>,
}

// Slots are only touched by whichever side holds the matching sequence
// claim, which is transferred with release/acquire ordering.
unsafe impl<T: Send> Sync for RingInner<T> {}
unsafe impl<T: Send> Send for RingInner<T> {}

/// Create a ring with the given capacity (rounded up to a power of two).
pub fn ring<T: Send>(capacity: usize) -> (RingProducer<T>, RingConsumer<T>) {
    let capacity = capacity.max(2).next_power_of_two() as u64;
    let slots = (0..capacity)
        .map(|i| Slot {
            seq: AtomicU64::new(i),
            value: UnsafeCell::new(None),
        })
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let inner = Arc::new(RingInner {
        mask: capacity - 1,
        capacity,
        head: AtomicU64::new(0),
        tail: AtomicU64::new(0),
        overwrites: AtomicU64::new(0),
        slots,
    });
    (
        RingProducer {
            inner: inner.clone(),
        },
        RingConsumer { inner },
    )
}

/// Writing half; owned by the simulation worker. Not cloneable: the ring is
/// strictly single-producer.
pub struct RingProducer<T: Send> {
    inner: Arc<RingInner<T>>,
}

impl<T: Send> RingProducer<T> {
    /// Push an entry, displacing the oldest unread entry when full.
    pub fn push(&self, value: T) -> PushOutcome {
        let inner = &*self.inner;
        let pos = inner.tail.load(Ordering::Relaxed);
        let slot = &inner.slots[(pos & inner.mask) as usize];
        let mut outcome = PushOutcome::Stored;
        loop {
            let seq = slot.seq.load(Ordering::Acquire);
            if seq == pos {
                unsafe {
                    *slot.value.get() = Some(value);
                }
                slot.seq.store(pos + 1, Ordering::Release);
                inner.tail.store(pos + 1, Ordering::Release);
                return outcome;
            }

            let head = inner.head.load(Ordering::Acquire);
            if head + inner.capacity <= pos {
                // Full: reclaim the oldest entry unless the consumer beats us
                // to it. Either way the slot frees up shortly.
                if inner
                    .head
                    .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    // We won the claim for position `head`, which maps to the
                    // same slot we want to write.
                    unsafe {
                        (*slot.value.get()).take();
                    }
                    slot.seq.store(head + inner.capacity, Ordering::Release);
                    inner.overwrites.fetch_add(1, Ordering::Relaxed);
                    outcome = PushOutcome::Overwrote;
                }
            }
            std::hint::spin_loop();
        }
    }

    /// Entries displaced by overwrite-on-full since creation.
    pub fn overwrites(&self) -> u64 {
        self.inner.overwrites.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        let tail = self.inner.tail.load(Ordering::Acquire);
        let head = self.inner.head.load(Ordering::Acquire);
        tail.saturating_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reading half; a single long-lived external consumer.
pub struct RingConsumer<T: Send> {
    inner: Arc<RingInner<T>>,
}

impl<T: Send> RingConsumer<T> {
    /// Pop the oldest available entry, if any.
    pub fn pop(&mut self) -> Option<T> {
        let inner = &*self.inner;
        loop {
            let head = inner.head.load(Ordering::Acquire);
            let tail = inner.tail.load(Ordering::Acquire);
            if head >= tail {
                return None;
            }
            let slot = &inner.slots[(head & inner.mask) as usize];
            let seq = slot.seq.load(Ordering::Acquire);
            if seq != head + 1 {
                // Producer is reclaiming this position; retry on fresh head.
                std::hint::spin_loop();
                continue;
            }
            if inner
                .head
                .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let value = unsafe { (*slot.value.get()).take() };
                slot.seq.store(head + inner.capacity, Ordering::Release);
                return value;
            }
        }
    }

    /// Next unread position; gaps between successive reads are bounded by the
    /// ring capacity.
    pub fn position(&self) -> u64 {
        self.inner.head.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        let tail = self.inner.tail.load(Ordering::Acquire);
        let head = self.inner.head.load(Ordering::Acquire);
        tail.saturating_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

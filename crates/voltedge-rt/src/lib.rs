//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Runtime helpers supporting the orchestrator."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Runtime plumbing shared by simulation workers: the per-tick event batch,
//! the lock-free snapshot ring, and tick pacing helpers.

pub mod event_batch;
pub mod metrics_ring;
pub mod pacing;

pub use event_batch::{BatchFull, Event, EventBatch, BATCH_CAPACITY};
pub use metrics_ring::{ring, PushOutcome, RingConsumer, RingProducer};
pub use pacing::{TickPacer, WallClockBudget};

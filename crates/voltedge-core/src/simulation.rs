//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Primary orchestration and lifecycle management."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use voltedge_grid::snapshot::AlertKind;
use voltedge_grid::{ComponentManifest, GridCommand, GridModel, Snapshot};
use voltedge_metrics::EngineMetrics;
use voltedge_rt::{EventBatch, RingConsumer, RingProducer, TickPacer, WallClockBudget};

use crate::error::OrchestratorError;

/// Identifier of a simulation, unique for the orchestrator's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimulationId(u64);

impl SimulationId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SimulationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sim-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Created,
    Running,
    Paused,
    Completed,
    Error,
}

impl SimulationStatus {
    /// Terminal states persist until explicit delete.
    pub fn is_terminal(self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Error)
    }
}

impl std::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SimulationStatus::Created => "created",
            SimulationStatus::Running => "running",
            SimulationStatus::Paused => "paused",
            SimulationStatus::Completed => "completed",
            SimulationStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Externally visible view of one simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationDescriptor {
    pub id: SimulationId,
    pub name: String,
    pub description: Option<String>,
    pub status: SimulationStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub tick_number: u64,
    pub plant_count: usize,
    pub line_count: usize,
}

#[derive(Debug)]
pub(crate) struct StatusCell {
    pub status: SimulationStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// The tick-owning half of a simulation, handed to whichever context is
/// advancing it: the worker thread while running, the caller in step mode.
pub(crate) struct EngineCore {
    pub grid: GridModel,
    pub producer: RingProducer<Snapshot>,
}

/// Shared simulation state. The grid itself lives inside `engine` and is
/// exclusively owned by one advancing context at a time; everything else is
/// cheap control-plane state.
pub(crate) struct SimulationShared {
    pub id: SimulationId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub manifest: ComponentManifest,
    pub status: Mutex<StatusCell>,
    pub batch: EventBatch<GridCommand>,
    pub cancel: AtomicBool,
    pub pause: AtomicBool,
    pub engine: Mutex<Option<EngineCore>>,
    pub latest: Mutex<Option<Snapshot>>,
    pub consumer: Mutex<Option<RingConsumer<Snapshot>>>,
    pub worker: Mutex<Option<JoinHandle<()>>>,
    pub last_tick: AtomicU64,
}

impl SimulationShared {
    pub(crate) fn new(
        id: SimulationId,
        name: String,
        description: Option<String>,
        grid: GridModel,
        producer: RingProducer<Snapshot>,
        consumer: RingConsumer<Snapshot>,
    ) -> Self {
        let manifest = grid.manifest();
        Self {
            id,
            name,
            description,
            created_at: Utc::now(),
            manifest,
            status: Mutex::new(StatusCell {
                status: SimulationStatus::Created,
                started_at: None,
                completed_at: None,
                error: None,
            }),
            batch: EventBatch::new(),
            cancel: AtomicBool::new(false),
            pause: AtomicBool::new(false),
            engine: Mutex::new(Some(EngineCore { grid, producer })),
            latest: Mutex::new(None),
            consumer: Mutex::new(Some(consumer)),
            worker: Mutex::new(None),
            last_tick: AtomicU64::new(0),
        }
    }

    pub(crate) fn status(&self) -> SimulationStatus {
        self.status.lock().status
    }

    pub(crate) fn descriptor(&self) -> SimulationDescriptor {
        let status = self.status.lock();
        SimulationDescriptor {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            status: status.status,
            created_at: self.created_at,
            started_at: status.started_at,
            completed_at: status.completed_at,
            error: status.error.clone(),
            tick_number: self.last_tick.load(Ordering::Acquire),
            plant_count: self.manifest.plant_count(),
            line_count: self.manifest.line_count(),
        }
    }

    pub(crate) fn set_terminal(&self, status: SimulationStatus, error: Option<String>) {
        let mut cell = self.status.lock();
        cell.status = status;
        cell.error = error;
        cell.completed_at = Some(Utc::now());
    }

    pub(crate) fn set_paused(&self) {
        self.status.lock().status = SimulationStatus::Paused;
    }
}

/// Per-worker configuration captured at start time.
pub(crate) struct WorkerContext {
    pub tick_rate: Duration,
    pub budget: Option<Duration>,
    pub metrics: Option<EngineMetrics>,
}

enum WorkerExit {
    Completed,
    Paused,
    TimedOut,
    Crashed,
}

/// Common per-tick bookkeeping for worker and step-mode advancement.
pub(crate) fn record_snapshot(
    shared: &SimulationShared,
    metrics: &Option<EngineMetrics>,
    engine: &mut EngineCore,
    snapshot: &Snapshot,
) {
    shared
        .last_tick
        .store(snapshot.tick_number, Ordering::Release);
    *shared.latest.lock() = Some(snapshot.clone());

    let overwrites_before = engine.producer.overwrites();
    engine.producer.push(snapshot.clone());

    let fault_records = engine.grid.drain_fault_records();
    if let Some(metrics) = metrics {
        let label = shared.id.to_string();
        metrics.record_tick(&label);
        let shortfall = snapshot
            .alerts
            .iter()
            .find_map(|alert| match alert.kind {
                AlertKind::UnmetDemand { shortfall_mw } => Some(shortfall_mw),
                _ => None,
            })
            .unwrap_or(0.0);
        metrics.set_unmet_demand(&label, shortfall);
        for record in fault_records.iter().filter(|record| record.applied) {
            metrics.record_fault(&record.kind.to_string());
        }
        let displaced = engine.producer.overwrites() - overwrites_before;
        if displaced > 0 {
            metrics.record_snapshot_overwrites(displaced);
        }
    }
}

/// Worker loop: one logical worker per running simulation. Cancellation,
/// pause, and the wall-clock budget are observed at tick boundaries only;
/// in-flight ticks always complete.
pub(crate) fn run_worker(shared: Arc<SimulationShared>, ctx: WorkerContext) {
    let Some(mut engine) = shared.engine.lock().take() else {
        error!(simulation = %shared.id, "worker started without an engine core");
        return;
    };
    if let Some(metrics) = &ctx.metrics {
        metrics.worker_started();
    }
    let mut pacer = TickPacer::new(ctx.tick_rate);
    let budget = WallClockBudget::new(ctx.budget);
    debug!(simulation = %shared.id, "worker loop entered");

    let exit = loop {
        if shared.cancel.load(Ordering::Acquire) {
            break WorkerExit::Completed;
        }
        if shared.pause.load(Ordering::Acquire) {
            break WorkerExit::Paused;
        }
        if budget.exceeded() {
            break WorkerExit::TimedOut;
        }

        let commands: Vec<GridCommand> = shared
            .batch
            .drain()
            .into_iter()
            .map(|event| event.payload)
            .collect();
        match std::panic::catch_unwind(AssertUnwindSafe(|| engine.grid.tick(commands))) {
            Ok(snapshot) => {
                record_snapshot(&shared, &ctx.metrics, &mut engine, &snapshot);
            }
            Err(_) => break WorkerExit::Crashed,
        }

        pacer.pace();
    };

    // Ownership of the grid returns to the shared cell; the last valid
    // snapshot is already preserved in `latest`.
    *shared.engine.lock() = Some(engine);

    match exit {
        WorkerExit::Completed => {
            shared.set_terminal(SimulationStatus::Completed, None);
            info!(simulation = %shared.id, "simulation completed");
        }
        WorkerExit::Paused => {
            shared.set_paused();
            info!(simulation = %shared.id, "simulation paused");
        }
        WorkerExit::TimedOut => {
            shared.set_terminal(
                SimulationStatus::Error,
                Some(OrchestratorError::TimedOut.to_string()),
            );
            warn!(simulation = %shared.id, "simulation exceeded wall-clock budget");
        }
        WorkerExit::Crashed => {
            shared.set_terminal(
                SimulationStatus::Error,
                Some("tick aborted: internal failure during advancement".to_owned()),
            );
            error!(simulation = %shared.id, "tick aborted; simulation moved to error state");
        }
    }
    if let Some(metrics) = &ctx.metrics {
        metrics.worker_stopped();
    }
}

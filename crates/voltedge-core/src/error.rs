//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Primary orchestration and lifecycle management."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use thiserror::Error;

use voltedge_grid::GridError;
use voltedge_rt::BatchFull;

use crate::simulation::{SimulationId, SimulationStatus};

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("maximum concurrent simulations reached ({limit})")]
    MaxSimulationsReached { limit: usize },
    #[error("simulation {0} not found")]
    NotFound(SimulationId),
    #[error("simulation is already running (status: {status})")]
    AlreadyRunning { status: SimulationStatus },
    #[error("simulation is not running (status: {status})")]
    NotRunning { status: SimulationStatus },
    #[error("simulation exceeded its wall-clock budget")]
    TimedOut,
    #[error("event queue is full; retry next tick")]
    EventQueueFull(#[from] BatchFull),
    #[error("snapshot stream consumer already taken")]
    SubscriberTaken,
    #[error("no snapshot available yet")]
    SnapshotUnavailable,
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

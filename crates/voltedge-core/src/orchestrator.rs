//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Primary orchestration and lifecycle management."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{error, info, warn};

use voltedge_common::config::EngineConfig;
use voltedge_common::time::SimClock;
use voltedge_grid::{ComponentId, FaultKind, GridCommand, GridModel, GridSpec, Snapshot};
use voltedge_metrics::EngineMetrics;
use voltedge_rt::{ring, RingConsumer};

use crate::error::{OrchestratorError, Result};
use crate::simulation::{
    record_snapshot, run_worker, SimulationDescriptor, SimulationId, SimulationShared,
    SimulationStatus, WorkerContext,
};

/// All simulations share one deterministic epoch, so identical configurations
/// stamp identical simulation timestamps regardless of when they start.
fn simulation_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_735_689_600, 0).expect("valid simulation epoch")
}

/// Health summary of the orchestrator, mirrored to external monitors.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub healthy: bool,
    pub message: String,
    pub simulations: usize,
    pub capacity: usize,
    pub running_workers: usize,
}

/// Owns every simulation and its worker. Readers of the map are common and
/// writers rare, so the map sits behind a read-write lock; per-simulation
/// state is reached through cheap `Arc` clones without holding it.
pub struct Orchestrator {
    config: EngineConfig,
    metrics: Option<EngineMetrics>,
    next_id: AtomicU64,
    simulations: RwLock<IndexMap<SimulationId, Arc<SimulationShared>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator. A retention sweeper thread is spawned unless
    /// `cleanup_interval` is zero.
    pub fn new(config: EngineConfig, metrics: Option<EngineMetrics>) -> Arc<Self> {
        let orchestrator = Arc::new(Self {
            config,
            metrics,
            next_id: AtomicU64::new(0),
            simulations: RwLock::new(IndexMap::new()),
            sweeper: Mutex::new(None),
            shutdown: Arc::new(AtomicBool::new(false)),
        });
        if !orchestrator.config.cleanup_interval.is_zero() {
            orchestrator.spawn_sweeper();
        }
        info!(
            max_simulations = orchestrator.config.max_simulations,
            tick_rate_ms = orchestrator.config.tick_rate.as_millis() as u64,
            "orchestrator started"
        );
        orchestrator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn spawn_sweeper(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let interval = self.config.cleanup_interval;
        let shutdown = self.shutdown.clone();
        let spawned = std::thread::Builder::new()
            .name("voltedge-sweeper".to_owned())
            .spawn(move || {
                let step = interval.min(Duration::from_millis(200));
                let mut elapsed = Duration::ZERO;
                loop {
                    std::thread::sleep(step);
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    elapsed += step;
                    if elapsed >= interval {
                        elapsed = Duration::ZERO;
                        let Some(orchestrator) = weak.upgrade() else {
                            break;
                        };
                        orchestrator.sweep_terminal();
                    }
                }
            });
        match spawned {
            Ok(handle) => *self.sweeper.lock() = Some(handle),
            Err(err) => warn!(error = %err, "failed to spawn retention sweeper"),
        }
    }

    fn get(&self, id: SimulationId) -> Result<Arc<SimulationShared>> {
        self.simulations
            .read()
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::NotFound(id))
    }

    /// Create a simulation from a validated grid spec.
    pub fn create(&self, spec: GridSpec) -> Result<SimulationId> {
        spec.validate()?;
        let mut simulations = self.simulations.write();
        if simulations.len() >= self.config.max_simulations {
            return Err(OrchestratorError::MaxSimulationsReached {
                limit: self.config.max_simulations,
            });
        }

        let id = SimulationId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let seed = self.config.seed_root ^ id.value();
        let clock = SimClock::deterministic(simulation_epoch(), self.config.tick_rate);
        let grid = GridModel::new(id.value(), &spec, self.config.tick_rate, seed, clock)?;
        let (producer, consumer) = ring(self.config.ring_capacity);
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("simulation-{}", id.value()));
        let shared = Arc::new(SimulationShared::new(
            id,
            name,
            spec.description.clone(),
            grid,
            producer,
            consumer,
        ));

        info!(
            simulation = %id,
            name = %shared.name,
            plants = shared.manifest.plant_count(),
            lines = shared.manifest.line_count(),
            "simulation created"
        );
        simulations.insert(id, shared);
        if let Some(metrics) = &self.metrics {
            metrics.set_simulation_count(simulations.len());
        }
        Ok(id)
    }

    /// Create a simulation from a TOML spec blob, as submitted by gateways.
    pub fn create_from_toml(&self, blob: &str) -> Result<SimulationId> {
        let spec: GridSpec = blob.parse().map_err(OrchestratorError::Grid)?;
        self.create(spec)
    }

    /// Start (or resume) a simulation on its own worker thread.
    pub fn start(&self, id: SimulationId) -> Result<()> {
        let shared = self.get(id)?;
        let previous = {
            let mut cell = shared.status.lock();
            match cell.status {
                SimulationStatus::Running => {
                    return Err(OrchestratorError::AlreadyRunning {
                        status: cell.status,
                    })
                }
                status if status.is_terminal() => {
                    return Err(OrchestratorError::NotRunning { status })
                }
                previous => {
                    cell.status = SimulationStatus::Running;
                    if cell.started_at.is_none() {
                        cell.started_at = Some(Utc::now());
                    }
                    previous
                }
            }
        };
        shared.cancel.store(false, Ordering::Release);
        shared.pause.store(false, Ordering::Release);

        let context = WorkerContext {
            tick_rate: self.config.tick_rate,
            budget: Some(self.config.simulation_timeout),
            metrics: self.metrics.clone(),
        };
        let worker_shared = shared.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("voltedge-{id}"))
            .spawn(move || run_worker(worker_shared, context));
        match spawned {
            Ok(handle) => {
                *shared.worker.lock() = Some(handle);
                info!(simulation = %id, "simulation started");
                Ok(())
            }
            Err(err) => {
                shared.status.lock().status = previous;
                error!(simulation = %id, error = %err, "worker spawn failed");
                Err(OrchestratorError::WorkerSpawn(err.to_string()))
            }
        }
    }

    /// Request a pause; the in-flight tick completes first.
    pub fn pause(&self, id: SimulationId) -> Result<()> {
        let shared = self.get(id)?;
        let status = shared.status();
        if status != SimulationStatus::Running {
            return Err(OrchestratorError::NotRunning { status });
        }
        shared.pause.store(true, Ordering::Release);
        join_worker(&shared);
        Ok(())
    }

    /// Stop a running simulation; it transitions to `completed`.
    pub fn stop(&self, id: SimulationId) -> Result<()> {
        let shared = self.get(id)?;
        self.stop_internal(&shared)
    }

    fn stop_internal(&self, shared: &Arc<SimulationShared>) -> Result<()> {
        let status = shared.status();
        if status != SimulationStatus::Running {
            return Err(OrchestratorError::NotRunning { status });
        }
        shared.cancel.store(true, Ordering::Release);
        join_worker(shared);
        Ok(())
    }

    /// Remove a simulation; a running one is stopped first.
    pub fn delete(&self, id: SimulationId) -> Result<()> {
        let mut simulations = self.simulations.write();
        let Some(shared) = simulations.get(&id).cloned() else {
            return Err(OrchestratorError::NotFound(id));
        };
        if shared.status() == SimulationStatus::Running {
            shared.cancel.store(true, Ordering::Release);
            join_worker(&shared);
        }
        simulations.shift_remove(&id);
        if let Some(metrics) = &self.metrics {
            metrics.set_simulation_count(simulations.len());
        }
        info!(simulation = %id, "simulation deleted");
        Ok(())
    }

    fn enqueue(&self, shared: &SimulationShared, command: GridCommand) -> Result<()> {
        shared.batch.push(Utc::now(), command)?;
        Ok(())
    }

    /// Queue a fault injection for the next tick.
    pub fn inject_fault(
        &self,
        id: SimulationId,
        target: ComponentId,
        kind: FaultKind,
    ) -> Result<()> {
        let shared = self.get(id)?;
        shared.manifest.validate_fault(target, kind)?;
        self.enqueue(&shared, GridCommand::InjectFault { target, kind })
    }

    /// Queue an operator setpoint for a plant.
    pub fn set_plant_output(&self, id: SimulationId, plant_id: u32, mw: f64) -> Result<()> {
        let shared = self.get(id)?;
        shared.manifest.validate_plant(plant_id)?;
        self.enqueue(&shared, GridCommand::SetPlantOutput { plant_id, mw })
    }

    /// Queue a repair of a plant, line, or substation node.
    pub fn repair_component(&self, id: SimulationId, target: ComponentId) -> Result<()> {
        let shared = self.get(id)?;
        shared.manifest.validate_repair(target)?;
        self.enqueue(&shared, GridCommand::RepairComponent { target })
    }

    /// Queue a demand surge (or relief) multiplier.
    pub fn set_load_multiplier(&self, id: SimulationId, multiplier: f64) -> Result<()> {
        let shared = self.get(id)?;
        self.enqueue(&shared, GridCommand::SetLoadMultiplier { multiplier })
    }

    /// Queue a plant start sequence.
    pub fn start_plant(&self, id: SimulationId, plant_id: u32) -> Result<()> {
        let shared = self.get(id)?;
        shared.manifest.validate_plant(plant_id)?;
        self.enqueue(&shared, GridCommand::StartPlant { plant_id })
    }

    /// Queue an orderly plant shutdown.
    pub fn stop_plant(&self, id: SimulationId, plant_id: u32) -> Result<()> {
        let shared = self.get(id)?;
        shared.manifest.validate_plant(plant_id)?;
        self.enqueue(&shared, GridCommand::StopPlant { plant_id })
    }

    /// Advance a non-running simulation by exactly one tick (step mode).
    pub fn tick(&self, id: SimulationId) -> Result<Snapshot> {
        let shared = self.get(id)?;
        let status = shared.status();
        if status == SimulationStatus::Running {
            return Err(OrchestratorError::AlreadyRunning { status });
        }
        if status.is_terminal() {
            return Err(OrchestratorError::NotRunning { status });
        }
        let mut guard = shared.engine.lock();
        let engine = guard
            .as_mut()
            .ok_or(OrchestratorError::AlreadyRunning {
                status: SimulationStatus::Running,
            })?;
        let commands: Vec<GridCommand> = shared
            .batch
            .drain()
            .into_iter()
            .map(|event| event.payload)
            .collect();
        let snapshot = engine.grid.tick(commands);
        record_snapshot(&shared, &self.metrics, engine, &snapshot);
        Ok(snapshot)
    }

    /// Advance successive ticks until `end_tick`. Cancellable through `stop`;
    /// the check happens at tick boundaries.
    pub fn run_until(&self, id: SimulationId, end_tick: u64) -> Result<Snapshot> {
        let shared = self.get(id)?;
        let status = shared.status();
        if status == SimulationStatus::Running {
            return Err(OrchestratorError::AlreadyRunning { status });
        }
        if status.is_terminal() {
            return Err(OrchestratorError::NotRunning { status });
        }
        let mut guard = shared.engine.lock();
        let engine = guard
            .as_mut()
            .ok_or(OrchestratorError::AlreadyRunning {
                status: SimulationStatus::Running,
            })?;
        let mut last = None;
        while engine.grid.tick_number() < end_tick {
            if shared.cancel.swap(false, Ordering::AcqRel) {
                break;
            }
            let commands: Vec<GridCommand> = shared
                .batch
                .drain()
                .into_iter()
                .map(|event| event.payload)
                .collect();
            let snapshot = engine.grid.tick(commands);
            record_snapshot(&shared, &self.metrics, engine, &snapshot);
            last = Some(snapshot);
        }
        drop(guard);
        last.or_else(|| shared.latest.lock().clone())
            .ok_or(OrchestratorError::SnapshotUnavailable)
    }

    /// Latest snapshot of a simulation, if any tick has run.
    pub fn snapshot(&self, id: SimulationId) -> Result<Snapshot> {
        let shared = self.get(id)?;
        let latest = shared.latest.lock().clone();
        latest.ok_or(OrchestratorError::SnapshotUnavailable)
    }

    /// Take the single long-lived snapshot stream consumer.
    pub fn subscribe(&self, id: SimulationId) -> Result<RingConsumer<Snapshot>> {
        let shared = self.get(id)?;
        let consumer = shared.consumer.lock().take();
        consumer.ok_or(OrchestratorError::SubscriberTaken)
    }

    /// Describe one simulation.
    pub fn describe(&self, id: SimulationId) -> Result<SimulationDescriptor> {
        Ok(self.get(id)?.descriptor())
    }

    /// List simulations in id order, optionally filtered by status.
    pub fn list(&self, filter: Option<SimulationStatus>) -> Vec<SimulationDescriptor> {
        self.simulations
            .read()
            .values()
            .map(|shared| shared.descriptor())
            .filter(|descriptor| filter.map_or(true, |status| descriptor.status == status))
            .collect()
    }

    /// Orchestrator health, mirrored to external monitors.
    pub fn health(&self) -> EngineHealth {
        let simulations = self.simulations.read();
        let running = simulations
            .values()
            .filter(|shared| shared.status() == SimulationStatus::Running)
            .count();
        let at_capacity = simulations.len() >= self.config.max_simulations;
        EngineHealth {
            healthy: !at_capacity,
            message: if at_capacity {
                "at maximum simulation capacity".to_owned()
            } else {
                "orchestrator is healthy".to_owned()
            },
            simulations: simulations.len(),
            capacity: self.config.max_simulations,
            running_workers: running,
        }
    }

    /// Remove terminal simulations older than the retention window. Returns
    /// the number removed.
    pub fn sweep_terminal(&self) -> usize {
        let retention = chrono::Duration::from_std(self.config.retention_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(86_400));
        let now = Utc::now();
        let mut simulations = self.simulations.write();
        let expired: Vec<SimulationId> = simulations
            .iter()
            .filter_map(|(id, shared)| {
                let cell = shared.status.lock();
                let completed_at = cell.completed_at?;
                (cell.status.is_terminal() && now - completed_at >= retention).then_some(*id)
            })
            .collect();
        for id in &expired {
            if let Some(shared) = simulations.shift_remove(id) {
                info!(
                    simulation = %id,
                    name = %shared.name,
                    "retention sweep removed terminal simulation"
                );
            }
        }
        if !expired.is_empty() {
            if let Some(metrics) = &self.metrics {
                metrics.set_simulation_count(simulations.len());
            }
        }
        expired.len()
    }

    /// Stop every running simulation and the sweeper thread.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let all: Vec<Arc<SimulationShared>> =
            self.simulations.read().values().cloned().collect();
        for shared in all {
            if shared.status() == SimulationStatus::Running {
                shared.cancel.store(true, Ordering::Release);
                join_worker(&shared);
            }
        }
        if let Some(handle) = self.sweeper.lock().take() {
            let _ = handle.join();
        }
        info!("orchestrator shutdown complete");
    }
}

fn join_worker(shared: &Arc<SimulationShared>) {
    let handle = shared.worker.lock().take();
    if let Some(handle) = handle {
        if handle.join().is_err() {
            error!(simulation = %shared.id, "worker thread panicked during join");
        }
    }
}

//! ---
//! ve_section: "03-persistence-logging"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Metrics collection and export utilities."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Engine-side Prometheus instrumentation. The registry is exposed
//! programmatically; scraping and serving it belongs to the gateway outside
//! this workspace.

use std::sync::Arc;

use anyhow::Result;
use prometheus::{GaugeVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Shared registry type used across engine hosts.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Metric bundle recorded by the simulation engine.
#[derive(Clone, Debug)]
pub struct EngineMetrics {
    registry: SharedRegistry,
    simulations_total: IntGauge,
    workers_active: IntGauge,
    ticks_total: IntCounterVec,
    faults_injected_total: IntCounterVec,
    snapshot_overwrites_total: IntCounter,
    unmet_demand_mw: GaugeVec,
}

impl EngineMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let simulations_total = IntGauge::with_opts(Opts::new(
            "voltedge_simulations_total",
            "Number of simulations currently owned by the orchestrator",
        ))?;
        registry.register(Box::new(simulations_total.clone()))?;

        let workers_active = IntGauge::with_opts(Opts::new(
            "voltedge_workers_active",
            "Number of simulation workers currently running",
        ))?;
        registry.register(Box::new(workers_active.clone()))?;

        let ticks_total = IntCounterVec::new(
            Opts::new(
                "voltedge_ticks_total",
                "Ticks processed, labelled by simulation",
            ),
            &["simulation"],
        )?;
        registry.register(Box::new(ticks_total.clone()))?;

        let faults_injected_total = IntCounterVec::new(
            Opts::new(
                "voltedge_faults_injected_total",
                "Applied fault injections by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(faults_injected_total.clone()))?;

        let snapshot_overwrites_total = IntCounter::with_opts(Opts::new(
            "voltedge_snapshot_overwrites_total",
            "Snapshots displaced from full rings before any consumer read them",
        ))?;
        registry.register(Box::new(snapshot_overwrites_total.clone()))?;

        let unmet_demand_mw = GaugeVec::new(
            Opts::new(
                "voltedge_unmet_demand_mw",
                "Latest demand shortfall per simulation in MW",
            ),
            &["simulation"],
        )?;
        registry.register(Box::new(unmet_demand_mw.clone()))?;

        Ok(Self {
            registry,
            simulations_total,
            workers_active,
            ticks_total,
            faults_injected_total,
            snapshot_overwrites_total,
            unmet_demand_mw,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn set_simulation_count(&self, count: usize) {
        self.simulations_total.set(count as i64);
    }

    pub fn worker_started(&self) {
        self.workers_active.inc();
    }

    pub fn worker_stopped(&self) {
        self.workers_active.dec();
    }

    pub fn record_tick(&self, simulation: &str) {
        self.ticks_total.with_label_values(&[simulation]).inc();
    }

    pub fn record_fault(&self, kind: &str) {
        self.faults_injected_total.with_label_values(&[kind]).inc();
    }

    pub fn record_snapshot_overwrites(&self, count: u64) {
        self.snapshot_overwrites_total.inc_by(count);
    }

    pub fn set_unmet_demand(&self, simulation: &str, shortfall_mw: f64) {
        self.unmet_demand_mw
            .with_label_values(&[simulation])
            .set(shortfall_mw);
    }
}

pub use prometheus;

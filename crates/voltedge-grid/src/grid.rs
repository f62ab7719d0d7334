//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use voltedge_common::rng::component_stream;
use voltedge_common::time::SimClock;

use crate::config::GridSpec;
use crate::error::{GridError, Result};
use crate::fault::{FaultKind, FaultRecord};
use crate::line::{Line, LineState, TripReason};
use crate::load::LoadModel;
use crate::numeric::clamp_finite;
use crate::plant::{Plant, PlantState};
use crate::snapshot::{Alert, ComponentMetric, Snapshot};

const FREQUENCY_MIN_HZ: f64 = 45.0;
const FREQUENCY_MAX_HZ: f64 = 55.0;
const FREQUENCY_DAMPING: f64 = 0.1;
const FREQUENCY_WARN_BAND_HZ: f64 = 2.0;
const FREQUENCY_TRIP_BAND_HZ: f64 = 3.0;
const SHORTFALL_EPSILON_MW: f64 = 1e-6;

// Stream-id namespaces keep per-component draws independent even when plant
// and line ids collide numerically.
const LINE_STREAM_BASE: u64 = 1 << 32;
const LOAD_STREAM_ID: u64 = 1 << 33;

/// Reference to one component of a grid. Ids are arena indices, unique within
/// their namespace for the lifetime of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    Plant(u32),
    Line(u32),
    Node(u32),
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentId::Plant(id) => write!(f, "plant-{id}"),
            ComponentId::Line(id) => write!(f, "line-{id}"),
            ComponentId::Node(id) => write!(f, "node-{id}"),
        }
    }
}

/// Mutation applied at the start of a tick, drained from the event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GridCommand {
    SetPlantOutput { plant_id: u32, mw: f64 },
    SetLoadMultiplier { multiplier: f64 },
    InjectFault { target: ComponentId, kind: FaultKind },
    RepairComponent { target: ComponentId },
    StartPlant { plant_id: u32 },
    StopPlant { plant_id: u32 },
}

/// Immutable index of the components a grid was built with, used by hosts to
/// validate commands without touching the (possibly worker-owned) grid.
#[derive(Debug, Clone)]
pub struct ComponentManifest {
    plant_ids: Vec<u32>,
    line_ids: Vec<u32>,
    node_ids: Vec<u32>,
}

impl ComponentManifest {
    pub fn plant_count(&self) -> usize {
        self.plant_ids.len()
    }

    pub fn line_count(&self) -> usize {
        self.line_ids.len()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        match id {
            ComponentId::Plant(plant) => self.plant_ids.binary_search(&plant).is_ok(),
            ComponentId::Line(line) => self.line_ids.binary_search(&line).is_ok(),
            ComponentId::Node(node) => self.node_ids.binary_search(&node).is_ok(),
        }
    }

    pub fn validate_plant(&self, plant_id: u32) -> Result<()> {
        if self.contains(ComponentId::Plant(plant_id)) {
            Ok(())
        } else {
            Err(GridError::UnknownComponent(ComponentId::Plant(plant_id)))
        }
    }

    /// Check existence and kind/target compatibility for a fault injection.
    pub fn validate_fault(&self, target: ComponentId, kind: FaultKind) -> Result<()> {
        if !self.contains(target) {
            return Err(GridError::UnknownComponent(target));
        }
        let compatible = matches!(
            (kind, target),
            (FaultKind::PlantOutage, ComponentId::Plant(_))
                | (FaultKind::LineTrip, ComponentId::Line(_))
                | (FaultKind::SubstationFailure, ComponentId::Node(_))
                | (FaultKind::CascadingFailure, ComponentId::Line(_))
                | (FaultKind::CyberAttack, ComponentId::Plant(_) | ComponentId::Line(_))
                | (FaultKind::NaturalDisaster, ComponentId::Plant(_) | ComponentId::Line(_))
        );
        if compatible {
            Ok(())
        } else {
            Err(GridError::UnsupportedFault {
                fault: kind,
                component: target,
            })
        }
    }

    /// Repair targets plants, lines, or (all lines of) a node.
    pub fn validate_repair(&self, target: ComponentId) -> Result<()> {
        if self.contains(target) {
            Ok(())
        } else {
            Err(GridError::UnknownComponent(target))
        }
    }
}

/// One simulated grid: owns its plants, lines, and load curve, and advances
/// them through the fixed tick pipeline.
#[derive(Debug)]
pub struct GridModel {
    simulation_id: u64,
    seed: u64,
    base_frequency_hz: f64,
    base_voltage_kv: f64,
    tick_step: Duration,
    clock: SimClock,
    plants: Vec<Plant>,
    lines: Vec<Line>,
    load: LoadModel,
    tick_number: u64,
    frequency_hz: f64,
    voltage_levels_kv: Vec<f64>,
    fault_log: Vec<FaultRecord>,
}

impl GridModel {
    pub fn new(
        simulation_id: u64,
        spec: &GridSpec,
        tick_step: Duration,
        seed: u64,
        clock: SimClock,
    ) -> Result<Self> {
        spec.validate()?;
        let mut plants: Vec<Plant> = spec.power_plants.iter().map(Plant::from_spec).collect();
        plants.sort_by_key(Plant::id);
        let mut lines: Vec<Line> = spec
            .transmission_lines
            .iter()
            .map(|line| Line::from_spec(line, spec.base_voltage))
            .collect();
        lines.sort_by_key(Line::id);

        let node_count = lines
            .iter()
            .map(|line| line.from_node().max(line.to_node()) as usize + 1)
            .max()
            .unwrap_or(1);

        Ok(Self {
            simulation_id,
            seed,
            base_frequency_hz: spec.base_frequency,
            base_voltage_kv: spec.base_voltage,
            tick_step,
            clock,
            plants,
            lines,
            load: LoadModel::from_spec(&spec.load_profile),
            tick_number: 0,
            frequency_hz: spec.base_frequency,
            voltage_levels_kv: Self::voltage_field(spec.base_voltage, node_count),
            fault_log: Vec::new(),
        })
    }

    fn voltage_field(base_kv: f64, node_count: usize) -> Vec<f64> {
        (0..node_count)
            .map(|i| base_kv * (1.0 + 0.05 * (0.1 * i as f64).sin()))
            .collect()
    }

    pub fn simulation_id(&self) -> u64 {
        self.simulation_id
    }

    pub fn tick_number(&self) -> u64 {
        self.tick_number
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn base_frequency_hz(&self) -> f64 {
        self.base_frequency_hz
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn plant(&self, plant_id: u32) -> Option<&Plant> {
        self.plants
            .binary_search_by_key(&plant_id, Plant::id)
            .ok()
            .map(|idx| &self.plants[idx])
    }

    pub fn line(&self, line_id: u32) -> Option<&Line> {
        self.lines
            .binary_search_by_key(&line_id, Line::id)
            .ok()
            .map(|idx| &self.lines[idx])
    }

    fn plant_mut(&mut self, plant_id: u32) -> Option<&mut Plant> {
        self.plants
            .binary_search_by_key(&plant_id, Plant::id)
            .ok()
            .map(move |idx| &mut self.plants[idx])
    }

    fn line_mut(&mut self, line_id: u32) -> Option<&mut Line> {
        self.lines
            .binary_search_by_key(&line_id, Line::id)
            .ok()
            .map(move |idx| &mut self.lines[idx])
    }

    pub fn manifest(&self) -> ComponentManifest {
        let mut node_ids: Vec<u32> = self
            .lines
            .iter()
            .flat_map(|line| [line.from_node(), line.to_node()])
            .collect();
        node_ids.sort_unstable();
        node_ids.dedup();
        ComponentManifest {
            plant_ids: self.plants.iter().map(Plant::id).collect(),
            line_ids: self.lines.iter().map(Line::id).collect(),
            node_ids,
        }
    }

    fn component_exists(&self, target: ComponentId) -> bool {
        match target {
            ComponentId::Plant(id) => self.plant(id).is_some(),
            ComponentId::Line(id) => self.line(id).is_some(),
            ComponentId::Node(node) => self
                .lines
                .iter()
                .any(|line| line.from_node() == node || line.to_node() == node),
        }
    }

    /// Apply one queued command. Errors leave the grid untouched.
    pub fn apply_command(&mut self, command: GridCommand) -> Result<()> {
        match command {
            GridCommand::SetPlantOutput { plant_id, mw } => {
                let plant = self
                    .plant_mut(plant_id)
                    .ok_or(GridError::UnknownComponent(ComponentId::Plant(plant_id)))?;
                plant.set_operator_setpoint(mw);
                if !plant.kind().constants().weather_dependent {
                    plant.set_target(mw);
                }
                Ok(())
            }
            GridCommand::SetLoadMultiplier { multiplier } => {
                self.load.set_multiplier(multiplier);
                Ok(())
            }
            GridCommand::InjectFault { target, kind } => {
                let record = self.inject_fault(target, kind)?;
                debug!(
                    simulation = self.simulation_id,
                    fault = %record.kind,
                    target = %record.target,
                    applied = record.applied,
                    "fault injection processed"
                );
                self.fault_log.push(record);
                Ok(())
            }
            GridCommand::RepairComponent { target } => self.repair_component(target).map(|_| ()),
            GridCommand::StartPlant { plant_id } => {
                let plant = self
                    .plant_mut(plant_id)
                    .ok_or(GridError::UnknownComponent(ComponentId::Plant(plant_id)))?;
                plant.request_start();
                Ok(())
            }
            GridCommand::StopPlant { plant_id } => {
                let plant = self
                    .plant_mut(plant_id)
                    .ok_or(GridError::UnknownComponent(ComponentId::Plant(plant_id)))?;
                plant.request_stop();
                Ok(())
            }
        }
    }

    /// Apply a fault to a component. Repeat injection of a kind whose effect
    /// already holds is a no-op, reported through `FaultRecord::applied`.
    pub fn inject_fault(&mut self, target: ComponentId, kind: FaultKind) -> Result<FaultRecord> {
        let injected_at = self.clock.timestamp_at(self.tick_number);
        match (kind, target) {
            (FaultKind::PlantOutage, ComponentId::Plant(id)) => {
                let plant = self
                    .plant_mut(id)
                    .ok_or(GridError::UnknownComponent(target))?;
                let applied = plant.state() != PlantState::Fault;
                if applied {
                    plant.enter_fault();
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("plant {id} forced into fault"),
                ))
            }
            (FaultKind::LineTrip, ComponentId::Line(id)) => {
                let line = self.line_mut(id).ok_or(GridError::UnknownComponent(target))?;
                let applied = line.state() != LineState::Tripped;
                if applied {
                    line.trip(TripReason::Injected);
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("line {id} tripped by injection"),
                ))
            }
            (FaultKind::SubstationFailure, ComponentId::Node(node)) => {
                if !self.component_exists(target) {
                    return Err(GridError::UnknownComponent(target));
                }
                let mut applied = false;
                for line in &mut self.lines {
                    let incident = line.from_node() == node || line.to_node() == node;
                    if incident && line.state() != LineState::Tripped {
                        line.trip(TripReason::Injected);
                        applied = true;
                    }
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("substation at node {node} lost; incident lines tripped"),
                ))
            }
            (FaultKind::CascadingFailure, ComponentId::Line(id)) => {
                let line = self.line_mut(id).ok_or(GridError::UnknownComponent(target))?;
                let applied = line.rating_scale() > 0.5;
                if applied {
                    line.halve_rating();
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("line {id} thermal rating halved"),
                ))
            }
            (FaultKind::CyberAttack, ComponentId::Plant(id)) => {
                let plant = self
                    .plant_mut(id)
                    .ok_or(GridError::UnknownComponent(target))?;
                let applied = plant.state() != PlantState::Fault;
                if applied {
                    let pinned = 0.1 * plant.max_capacity_mw();
                    plant.set_target(pinned);
                    plant.enter_fault();
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("plant {id} compromised; output pinned then faulted"),
                ))
            }
            (FaultKind::CyberAttack, ComponentId::Line(id)) => {
                let line = self.line_mut(id).ok_or(GridError::UnknownComponent(target))?;
                let applied = (line.observed_flow_factor() - 1.5).abs() > f64::EPSILON;
                if applied {
                    line.set_observed_flow_factor(1.5);
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("line {id} telemetry distorted by factor 1.5"),
                ))
            }
            (FaultKind::NaturalDisaster, ComponentId::Plant(id)) => {
                let plant = self
                    .plant_mut(id)
                    .ok_or(GridError::UnknownComponent(target))?;
                let applied = !plant.is_permanently_damaged();
                if applied {
                    plant.mark_permanently_damaged();
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("plant {id} destroyed; offline until repaired"),
                ))
            }
            (FaultKind::NaturalDisaster, ComponentId::Line(id)) => {
                let line = self.line_mut(id).ok_or(GridError::UnknownComponent(target))?;
                let applied = !line.is_permanently_damaged();
                if applied {
                    line.mark_permanently_damaged();
                }
                Ok(FaultRecord::new(
                    kind,
                    target,
                    applied,
                    injected_at,
                    format!("line {id} destroyed; tripped until repaired"),
                ))
            }
            (kind, target) => {
                if self.component_exists(target) {
                    Err(GridError::UnsupportedFault {
                        fault: kind,
                        component: target,
                    })
                } else {
                    Err(GridError::UnknownComponent(target))
                }
            }
        }
    }

    /// Repair a plant, a line, or every line incident to a node. Returns
    /// whether any component actually changed state.
    pub fn repair_component(&mut self, target: ComponentId) -> Result<bool> {
        match target {
            ComponentId::Plant(id) => {
                let plant = self
                    .plant_mut(id)
                    .ok_or(GridError::UnknownComponent(target))?;
                Ok(plant.repair())
            }
            ComponentId::Line(id) => {
                let line = self.line_mut(id).ok_or(GridError::UnknownComponent(target))?;
                Ok(line.repair())
            }
            ComponentId::Node(node) => {
                if !self.component_exists(target) {
                    return Err(GridError::UnknownComponent(target));
                }
                let mut repaired = false;
                for line in &mut self.lines {
                    if line.from_node() == node || line.to_node() == node {
                        repaired |= line.repair();
                    }
                }
                Ok(repaired)
            }
        }
    }

    /// Records of injections applied since the last drain.
    pub fn drain_fault_records(&mut self) -> Vec<FaultRecord> {
        std::mem::take(&mut self.fault_log)
    }

    /// Advance the grid by exactly one tick and return the snapshot.
    ///
    /// `commands` must already be in causal order; the event queue sorts by
    /// `(timestamp, event_id)` before handing them over. Command failures are
    /// logged and skipped so a bad event cannot stall the simulation.
    pub fn tick(&mut self, commands: Vec<GridCommand>) -> Snapshot {
        let dt_s = self.tick_step.as_secs_f64();
        let next_tick = self.tick_number + 1;
        let sim_seconds = self.clock.elapsed_seconds(next_tick);
        let mut alerts = Vec::new();

        // 1. Drain queued events.
        for command in commands {
            if let Err(err) = self.apply_command(command) {
                warn!(
                    simulation = self.simulation_id,
                    error = %err,
                    "queued command rejected"
                );
            }
        }

        // 2. Weather-dependent plants track the weather model, capped by any
        //    operator ceiling.
        for plant in &mut self.plants {
            if let Some(ceiling) = plant.weather_ceiling(sim_seconds) {
                let capped = match plant.operator_setpoint_mw() {
                    Some(cap) => ceiling.min(cap),
                    None => ceiling,
                };
                plant.set_target(capped);
            }
        }

        // 3. Demand for this tick.
        let noise = component_stream(self.seed, LOAD_STREAM_ID, next_tick).next_f64();
        let demand_mw = self.load.demand_mw(sim_seconds, noise);

        // 4. Greedy dispatch in ascending plant id order.
        let mut remaining = demand_mw;
        for plant in &mut self.plants {
            if !plant.is_online() {
                continue;
            }
            let weather = plant.kind().constants().weather_dependent;
            let pinned = !weather && plant.operator_setpoint_mw().is_some();
            let ceiling = if weather {
                plant.target_output_mw()
            } else if let Some(setpoint) = plant.operator_setpoint_mw() {
                setpoint
            } else {
                plant.max_capacity_mw()
            };
            let assigned = if pinned {
                ceiling
            } else {
                remaining.max(0.0).min(ceiling)
            };
            plant.set_target(assigned);
            remaining -= plant.target_output_mw();
        }
        if remaining > SHORTFALL_EPSILON_MW {
            alerts.push(Alert::unmet_demand(remaining));
        }

        // 5. Ramp every plant with its deterministic failure draw.
        for plant in &mut self.plants {
            let draw = component_stream(self.seed, plant.id() as u64, next_tick).next_f64();
            plant.advance(dt_s, draw);
            if !plant.current_output_mw().is_finite() {
                let component = ComponentId::Plant(plant.id());
                let err = GridError::Degenerate { component };
                warn!(simulation = self.simulation_id, error = %err, "plant forced out of service");
                plant.enter_fault();
                alerts.push(Alert::degenerate(component));
            }
        }

        // 6. Line flows from the node voltage field.
        for line in &mut self.lines {
            let v_from = self
                .voltage_levels_kv
                .get(line.from_node() as usize)
                .copied()
                .unwrap_or(self.base_voltage_kv);
            let v_to = self
                .voltage_levels_kv
                .get(line.to_node() as usize)
                .copied()
                .unwrap_or(self.base_voltage_kv);
            let draw =
                component_stream(self.seed, LINE_STREAM_BASE | line.id() as u64, next_tick)
                    .next_f64();
            line.update(v_from, v_to, self.base_voltage_kv, dt_s, draw);
            if !line.current_flow_mw().is_finite() {
                let component = ComponentId::Line(line.id());
                let err = GridError::Degenerate { component };
                warn!(simulation = self.simulation_id, error = %err, "line forced out of service");
                line.trip(TripReason::RandomFailure);
                alerts.push(Alert::degenerate(component));
            }
        }

        // 7. Frequency from the generation/consumption imbalance.
        let generation: f64 = self.plants.iter().map(Plant::current_output_mw).sum();
        let consumption = demand_mw;
        self.frequency_hz = clamp_finite(
            self.base_frequency_hz
                + (generation - consumption) / generation.max(1.0) * FREQUENCY_DAMPING,
            FREQUENCY_MIN_HZ,
            FREQUENCY_MAX_HZ,
        );

        // 8. Node voltage field, reallocated only when the node count changes.
        let node_count = self
            .lines
            .iter()
            .map(|line| line.from_node().max(line.to_node()) as usize + 1)
            .max()
            .unwrap_or(1);
        if self.voltage_levels_kv.len() != node_count {
            self.voltage_levels_kv = Self::voltage_field(self.base_voltage_kv, node_count);
        }

        // 9. Cascade check: warn beyond 2 Hz, curtail renewables beyond 3 Hz.
        let deviation = (self.frequency_hz - self.base_frequency_hz).abs();
        if deviation > FREQUENCY_WARN_BAND_HZ {
            alerts.push(Alert::frequency_deviation(self.frequency_hz));
        }
        let mut final_generation = generation;
        if deviation > FREQUENCY_TRIP_BAND_HZ {
            alerts.push(Alert::protective_shutdown());
            for plant in &mut self.plants {
                if plant.kind().is_curtailable_renewable() {
                    plant.curtail();
                }
            }
            final_generation = self.plants.iter().map(Plant::current_output_mw).sum();
        }

        // 10. Assemble the snapshot.
        let mut active_failures: Vec<ComponentId> = Vec::new();
        for plant in &self.plants {
            if plant.is_failed() {
                active_failures.push(ComponentId::Plant(plant.id()));
            }
        }
        for line in &self.lines {
            if line.state() == LineState::Tripped {
                active_failures.push(ComponentId::Line(line.id()));
            }
        }
        let efficiency = if consumption > 0.0 {
            clamp_finite(final_generation / consumption * 100.0, 0.0, 100.0)
        } else {
            100.0
        };

        self.tick_number = next_tick;
        Snapshot {
            simulation_id: self.simulation_id,
            tick_number: next_tick,
            timestamp: self.clock.timestamp_at(next_tick),
            total_generation_mw: final_generation,
            total_consumption_mw: consumption,
            grid_frequency_hz: self.frequency_hz,
            grid_voltage_kv: self.voltage_levels_kv.first().copied().unwrap_or(self.base_voltage_kv),
            voltage_levels_kv: self.voltage_levels_kv.clone(),
            efficiency_percentage: efficiency,
            fault_count: active_failures.len() as u32,
            active_failure_ids: active_failures,
            alerts,
        }
    }

    /// Per-component telemetry for this tick. Reports observed values, so an
    /// active telemetry distortion is visible here and only here.
    pub fn component_metrics(&self) -> Vec<ComponentMetric> {
        let mut metrics = Vec::with_capacity(self.plants.len() + 2 * self.lines.len());
        for plant in &self.plants {
            metrics.push(ComponentMetric {
                component: ComponentId::Plant(plant.id()),
                metric: "output".to_owned(),
                value: plant.current_output_mw(),
                unit: "MW".to_owned(),
            });
        }
        for line in &self.lines {
            metrics.push(ComponentMetric {
                component: ComponentId::Line(line.id()),
                metric: "flow".to_owned(),
                value: line.observed_flow_mw(),
                unit: "MW".to_owned(),
            });
            metrics.push(ComponentMetric {
                component: ComponentId::Line(line.id()),
                metric: "loss".to_owned(),
                value: line.power_loss_mw(),
                unit: "MW".to_owned(),
            });
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LineSpec, LoadProfileSpec, PlantSpec};
    use crate::plant::PlantKind;

    fn spec_with_line() -> GridSpec {
        GridSpec {
            name: None,
            description: None,
            base_frequency: 50.0,
            base_voltage: 230.0,
            power_plants: vec![PlantSpec {
                id: 1,
                name: None,
                kind: PlantKind::Coal,
                max_capacity_mw: 500.0,
                efficiency: 0.38,
                location: None,
                is_operational: true,
                initial_output_mw: 300.0,
            }],
            transmission_lines: vec![
                LineSpec {
                    id: 1,
                    from_node: 0,
                    to_node: 1,
                    capacity_mw: 400.0,
                    length_km: 60.0,
                    resistance_per_km: 0.05,
                    reactance_per_km: 0.4,
                    is_operational: true,
                },
                LineSpec {
                    id: 2,
                    from_node: 1,
                    to_node: 2,
                    capacity_mw: 400.0,
                    length_km: 40.0,
                    resistance_per_km: 0.05,
                    reactance_per_km: 0.4,
                    is_operational: true,
                },
            ],
            load_profile: LoadProfileSpec {
                base_load_mw: 300.0,
                ..LoadProfileSpec::default()
            },
        }
    }

    fn model(spec: &GridSpec) -> GridModel {
        GridModel::new(
            1,
            spec,
            Duration::from_millis(100),
            0xA5A5,
            SimClock::deterministic(
                chrono::DateTime::from_timestamp(1_735_689_600, 0).unwrap(),
                Duration::from_millis(100),
            ),
        )
        .unwrap()
    }

    #[test]
    fn manifest_validates_fault_pairings() {
        let grid = model(&spec_with_line());
        let manifest = grid.manifest();
        manifest
            .validate_fault(ComponentId::Plant(1), FaultKind::PlantOutage)
            .unwrap();
        manifest
            .validate_fault(ComponentId::Node(1), FaultKind::SubstationFailure)
            .unwrap();
        let err = manifest
            .validate_fault(ComponentId::Plant(1), FaultKind::LineTrip)
            .unwrap_err();
        assert!(matches!(err, GridError::UnsupportedFault { .. }));
        let err = manifest
            .validate_fault(ComponentId::Plant(99), FaultKind::PlantOutage)
            .unwrap_err();
        assert!(matches!(err, GridError::UnknownComponent(_)));
    }

    #[test]
    fn substation_failure_trips_incident_lines_only() {
        let mut grid = model(&spec_with_line());
        let record = grid
            .inject_fault(ComponentId::Node(2), FaultKind::SubstationFailure)
            .unwrap();
        assert!(record.applied);
        assert_eq!(grid.line(1).unwrap().state(), LineState::Operational);
        assert_eq!(grid.line(2).unwrap().state(), LineState::Tripped);
    }

    #[test]
    fn repeat_injection_is_a_no_op() {
        let mut grid = model(&spec_with_line());
        let first = grid
            .inject_fault(ComponentId::Plant(1), FaultKind::PlantOutage)
            .unwrap();
        assert!(first.applied);
        let output_after_first = grid.plant(1).unwrap().current_output_mw();
        let second = grid
            .inject_fault(ComponentId::Plant(1), FaultKind::PlantOutage)
            .unwrap();
        assert!(!second.applied);
        assert_eq!(grid.plant(1).unwrap().state(), PlantState::Fault);
        assert_eq!(grid.plant(1).unwrap().current_output_mw(), output_after_first);
    }

    #[test]
    fn cyber_attack_on_line_distorts_telemetry_only() {
        let mut grid = model(&spec_with_line());
        grid.inject_fault(ComponentId::Line(1), FaultKind::CyberAttack)
            .unwrap();
        let snapshot = grid.tick(Vec::new());
        let physical = grid.line(1).unwrap().current_flow_mw();
        let observed = grid.line(1).unwrap().observed_flow_mw();
        assert!((observed - physical * 1.5).abs() < 1e-9);
        // Snapshot aggregates stay physical.
        assert!(snapshot.total_generation_mw >= 0.0);
        let flow_metric = grid
            .component_metrics()
            .into_iter()
            .find(|m| m.component == ComponentId::Line(1) && m.metric == "flow")
            .unwrap();
        assert!((flow_metric.value - observed).abs() < 1e-9);
    }

    #[test]
    fn natural_disaster_is_permanent_until_repair() {
        let mut grid = model(&spec_with_line());
        grid.inject_fault(ComponentId::Plant(1), FaultKind::NaturalDisaster)
            .unwrap();
        assert_eq!(grid.plant(1).unwrap().state(), PlantState::Fault);
        assert!(grid.repair_component(ComponentId::Plant(1)).unwrap());
        assert_eq!(grid.plant(1).unwrap().state(), PlantState::Online);
    }

    #[test]
    fn node_repair_restores_incident_lines() {
        let mut grid = model(&spec_with_line());
        grid.inject_fault(ComponentId::Node(1), FaultKind::SubstationFailure)
            .unwrap();
        assert_eq!(grid.line(1).unwrap().state(), LineState::Tripped);
        assert!(grid.repair_component(ComponentId::Node(1)).unwrap());
        assert_eq!(grid.line(1).unwrap().state(), LineState::Operational);
        assert_eq!(grid.line(2).unwrap().state(), LineState::Operational);
    }
}

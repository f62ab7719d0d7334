//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::f64::consts::{FRAC_PI_3, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::config::PlantSpec;
use crate::numeric::clamp_finite;

const HOURS_PER_YEAR: f64 = 8760.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

/// Generation technology. The kind fixes every derived constant through
/// [`PlantKind::constants`]; there is no per-instance dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    Coal,
    Gas,
    Nuclear,
    Hydro,
    Wind,
    Solar,
    BatteryStorage,
    Geothermal,
}

/// Derived constants for a plant kind.
#[derive(Debug, Clone, Copy)]
pub struct PlantKindConstants {
    /// Minimum stable output as a fraction of capacity while online.
    pub min_output_ratio: f64,
    /// Ramp rate as a fraction of capacity per minute.
    pub ramp_ratio_per_min: f64,
    /// MJ of fuel per kWh generated; zero for non-thermal kinds.
    pub heat_rate_mj_per_kwh: f64,
    /// Tonnes of CO2 per MWh generated.
    pub co2_t_per_mwh: f64,
    /// Operational hours between scheduled maintenance windows.
    pub maintenance_interval_h: f64,
    /// Length of one maintenance window in hours.
    pub maintenance_duration_h: f64,
    /// Time to synchronise from a cold start.
    pub startup_h: f64,
    /// Time for an orderly shutdown.
    pub shutdown_h: f64,
    /// Baseline failure rate per operational hour; ages with service life.
    pub base_failure_rate_per_h: f64,
    /// Long-run achievable fraction of nameplate capacity.
    pub capacity_factor: f64,
    /// Whether output follows the weather model instead of dispatch.
    pub weather_dependent: bool,
}

impl PlantKind {
    pub const fn constants(self) -> PlantKindConstants {
        match self {
            PlantKind::Coal => PlantKindConstants {
                min_output_ratio: 0.30,
                ramp_ratio_per_min: 0.05,
                heat_rate_mj_per_kwh: 10.5,
                co2_t_per_mwh: 0.90,
                maintenance_interval_h: 2000.0,
                maintenance_duration_h: 48.0,
                startup_h: 6.0,
                shutdown_h: 2.0,
                base_failure_rate_per_h: 2.0e-5,
                capacity_factor: 0.85,
                weather_dependent: false,
            },
            PlantKind::Gas => PlantKindConstants {
                min_output_ratio: 0.20,
                ramp_ratio_per_min: 0.20,
                heat_rate_mj_per_kwh: 7.8,
                co2_t_per_mwh: 0.40,
                maintenance_interval_h: 3000.0,
                maintenance_duration_h: 24.0,
                startup_h: 0.5,
                shutdown_h: 0.25,
                base_failure_rate_per_h: 1.5e-5,
                capacity_factor: 0.87,
                weather_dependent: false,
            },
            PlantKind::Nuclear => PlantKindConstants {
                min_output_ratio: 0.50,
                ramp_ratio_per_min: 0.02,
                heat_rate_mj_per_kwh: 10.4,
                co2_t_per_mwh: 0.0,
                maintenance_interval_h: 8000.0,
                maintenance_duration_h: 240.0,
                startup_h: 24.0,
                shutdown_h: 12.0,
                base_failure_rate_per_h: 5.0e-6,
                capacity_factor: 0.92,
                weather_dependent: false,
            },
            PlantKind::Hydro => PlantKindConstants {
                min_output_ratio: 0.10,
                ramp_ratio_per_min: 0.50,
                heat_rate_mj_per_kwh: 0.0,
                co2_t_per_mwh: 0.0,
                maintenance_interval_h: 4000.0,
                maintenance_duration_h: 72.0,
                startup_h: 0.1,
                shutdown_h: 0.1,
                base_failure_rate_per_h: 8.0e-6,
                capacity_factor: 0.45,
                weather_dependent: true,
            },
            PlantKind::Wind => PlantKindConstants {
                min_output_ratio: 0.0,
                ramp_ratio_per_min: 1.0,
                heat_rate_mj_per_kwh: 0.0,
                co2_t_per_mwh: 0.0,
                maintenance_interval_h: 1500.0,
                maintenance_duration_h: 12.0,
                startup_h: 0.05,
                shutdown_h: 0.05,
                base_failure_rate_per_h: 3.0e-5,
                capacity_factor: 0.35,
                weather_dependent: true,
            },
            PlantKind::Solar => PlantKindConstants {
                min_output_ratio: 0.0,
                ramp_ratio_per_min: 1.0,
                heat_rate_mj_per_kwh: 0.0,
                co2_t_per_mwh: 0.0,
                maintenance_interval_h: 2500.0,
                maintenance_duration_h: 8.0,
                startup_h: 0.02,
                shutdown_h: 0.02,
                base_failure_rate_per_h: 1.0e-5,
                capacity_factor: 0.25,
                weather_dependent: true,
            },
            PlantKind::BatteryStorage => PlantKindConstants {
                min_output_ratio: 0.0,
                ramp_ratio_per_min: 2.0,
                heat_rate_mj_per_kwh: 0.0,
                co2_t_per_mwh: 0.0,
                maintenance_interval_h: 5000.0,
                maintenance_duration_h: 6.0,
                startup_h: 0.005,
                shutdown_h: 0.005,
                base_failure_rate_per_h: 1.2e-5,
                capacity_factor: 0.95,
                weather_dependent: false,
            },
            PlantKind::Geothermal => PlantKindConstants {
                min_output_ratio: 0.40,
                ramp_ratio_per_min: 0.10,
                heat_rate_mj_per_kwh: 0.0,
                co2_t_per_mwh: 0.05,
                maintenance_interval_h: 6000.0,
                maintenance_duration_h: 96.0,
                startup_h: 2.0,
                shutdown_h: 1.0,
                base_failure_rate_per_h: 9.0e-6,
                capacity_factor: 0.90,
                weather_dependent: false,
            },
        }
    }

    /// Kinds curtailed by the protective shutdown. Storage keeps dispatching.
    pub fn is_curtailable_renewable(self) -> bool {
        matches!(self, PlantKind::Wind | PlantKind::Solar)
    }
}

impl std::fmt::Display for PlantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlantKind::Coal => "coal",
            PlantKind::Gas => "gas",
            PlantKind::Nuclear => "nuclear",
            PlantKind::Hydro => "hydro",
            PlantKind::Wind => "wind",
            PlantKind::Solar => "solar",
            PlantKind::BatteryStorage => "battery_storage",
            PlantKind::Geothermal => "geothermal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantState {
    Online,
    Offline,
    Maintenance,
    Fault,
    Startup,
    Shutdown,
}

/// One generator in a grid arena. Mutated only by the owning grid's tick
/// pipeline and fault injection.
#[derive(Debug, Clone)]
pub struct Plant {
    id: u32,
    name: String,
    kind: PlantKind,
    max_capacity_mw: f64,
    efficiency: f64,
    state: PlantState,
    current_output_mw: f64,
    target_output_mw: f64,
    operator_setpoint_mw: Option<f64>,
    operational_hours: f64,
    next_maintenance_due_h: f64,
    maintenance_remaining_h: f64,
    transition_remaining_h: f64,
    permanently_damaged: bool,
    co2_emitted_t: f64,
}

impl Plant {
    pub fn from_spec(spec: &PlantSpec) -> Self {
        let constants = spec.kind.constants();
        let state = if spec.is_operational {
            PlantState::Online
        } else {
            PlantState::Offline
        };
        let min = constants.min_output_ratio * spec.max_capacity_mw;
        let initial = if spec.is_operational {
            clamp_finite(spec.initial_output_mw, min, spec.max_capacity_mw)
        } else {
            0.0
        };
        Self {
            id: spec.id,
            name: spec
                .name
                .clone()
                .unwrap_or_else(|| format!("plant-{}", spec.id)),
            kind: spec.kind,
            max_capacity_mw: spec.max_capacity_mw,
            efficiency: spec.efficiency,
            state,
            current_output_mw: initial,
            target_output_mw: initial,
            operator_setpoint_mw: None,
            operational_hours: 0.0,
            next_maintenance_due_h: constants.maintenance_interval_h,
            maintenance_remaining_h: 0.0,
            transition_remaining_h: 0.0,
            permanently_damaged: false,
            co2_emitted_t: 0.0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PlantKind {
        self.kind
    }

    pub fn state(&self) -> PlantState {
        self.state
    }

    pub fn max_capacity_mw(&self) -> f64 {
        self.max_capacity_mw
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn current_output_mw(&self) -> f64 {
        self.current_output_mw
    }

    pub fn target_output_mw(&self) -> f64 {
        self.target_output_mw
    }

    pub fn operational_hours(&self) -> f64 {
        self.operational_hours
    }

    pub fn co2_emitted_t(&self) -> f64 {
        self.co2_emitted_t
    }

    pub fn is_online(&self) -> bool {
        self.state == PlantState::Online
    }

    pub fn is_failed(&self) -> bool {
        self.state == PlantState::Fault || self.permanently_damaged
    }

    pub fn min_output_mw(&self) -> f64 {
        self.kind.constants().min_output_ratio * self.max_capacity_mw
    }

    /// Weather-derived output ceiling, `None` for dispatchable kinds.
    ///
    /// Solar follows a half-sine between 06:00 and 18:00 local, wind a
    /// phase-shifted diurnal sine, hydro a slow seasonal curve. All are pure
    /// functions of simulation time, so replays reproduce them exactly.
    pub fn weather_ceiling(&self, sim_seconds: f64) -> Option<f64> {
        let constants = self.kind.constants();
        if !constants.weather_dependent {
            return None;
        }
        let available = self.max_capacity_mw * constants.capacity_factor;
        let day_fraction = (sim_seconds.rem_euclid(SECONDS_PER_DAY)) / SECONDS_PER_DAY;
        let factor = match self.kind {
            PlantKind::Solar => {
                let hour = day_fraction * 24.0;
                if (6.0..18.0).contains(&hour) {
                    (PI * (hour - 6.0) / 12.0).sin()
                } else {
                    0.0
                }
            }
            PlantKind::Wind => {
                let phase = FRAC_PI_3 + self.id as f64 * 0.7;
                0.5 + 0.5 * (TAU * day_fraction + phase).sin()
            }
            PlantKind::Hydro => {
                let year_fraction = (sim_seconds.rem_euclid(SECONDS_PER_YEAR)) / SECONDS_PER_YEAR;
                0.75 + 0.25 * (TAU * year_fraction).sin()
            }
            _ => 1.0,
        };
        Some(clamp_finite(available * factor, 0.0, self.max_capacity_mw))
    }

    /// Record an operator setpoint. For weather-dependent kinds the value acts
    /// only as a ceiling; for dispatchable kinds it pins the dispatch target.
    pub(crate) fn set_operator_setpoint(&mut self, mw: f64) {
        self.operator_setpoint_mw = Some(clamp_finite(mw, 0.0, self.max_capacity_mw));
    }

    pub fn operator_setpoint_mw(&self) -> Option<f64> {
        self.operator_setpoint_mw
    }

    /// Assign the tick's dispatch target, clamped to the operating envelope.
    pub(crate) fn set_target(&mut self, mw: f64) {
        if self.state != PlantState::Online {
            return;
        }
        self.target_output_mw = clamp_finite(mw, self.min_output_mw(), self.max_capacity_mw);
    }

    /// Advance one tick. `failure_draw` is this plant's deterministic draw in
    /// `[0, 1)` for the random-failure check.
    pub(crate) fn advance(&mut self, dt_s: f64, failure_draw: f64) {
        let dt_h = dt_s / 3600.0;
        match self.state {
            PlantState::Offline | PlantState::Fault => {
                self.current_output_mw = 0.0;
                self.target_output_mw = 0.0;
            }
            PlantState::Startup => {
                self.current_output_mw = 0.0;
                self.transition_remaining_h -= dt_h;
                if self.transition_remaining_h <= 0.0 {
                    self.transition_remaining_h = 0.0;
                    self.state = PlantState::Online;
                }
            }
            PlantState::Shutdown => {
                self.current_output_mw = 0.0;
                self.target_output_mw = 0.0;
                self.transition_remaining_h -= dt_h;
                if self.transition_remaining_h <= 0.0 {
                    self.transition_remaining_h = 0.0;
                    self.state = PlantState::Offline;
                }
            }
            PlantState::Maintenance => {
                self.current_output_mw = 0.0;
                self.maintenance_remaining_h -= dt_h;
                if self.maintenance_remaining_h <= 0.0 {
                    self.maintenance_remaining_h = 0.0;
                    self.state = PlantState::Online;
                }
            }
            PlantState::Online => self.advance_online(dt_s, dt_h, failure_draw),
        }
    }

    fn advance_online(&mut self, dt_s: f64, dt_h: f64, failure_draw: f64) {
        let constants = self.kind.constants();
        let min = self.min_output_mw();
        let ramp_mw = constants.ramp_ratio_per_min * self.max_capacity_mw * (dt_s / 60.0);
        let target = clamp_finite(self.target_output_mw, min, self.max_capacity_mw);
        let delta = target - self.current_output_mw;
        let next = if delta > ramp_mw {
            self.current_output_mw + ramp_mw
        } else if delta < -ramp_mw {
            self.current_output_mw - ramp_mw
        } else {
            target
        };
        self.current_output_mw = clamp_finite(next, min, self.max_capacity_mw);

        self.operational_hours += dt_h;
        self.co2_emitted_t += self.current_output_mw * dt_h * constants.co2_t_per_mwh;

        if self.operational_hours >= self.next_maintenance_due_h {
            self.state = PlantState::Maintenance;
            self.maintenance_remaining_h = constants.maintenance_duration_h;
            self.next_maintenance_due_h = self.operational_hours + constants.maintenance_interval_h;
            self.current_output_mw = 0.0;
            self.target_output_mw = 0.0;
            return;
        }

        let probability = constants.base_failure_rate_per_h
            * (1.0 + self.operational_hours / HOURS_PER_YEAR)
            * dt_h;
        if failure_draw < probability {
            self.enter_fault();
        }
    }

    pub(crate) fn enter_fault(&mut self) {
        self.state = PlantState::Fault;
        self.current_output_mw = 0.0;
        self.target_output_mw = 0.0;
    }

    pub(crate) fn mark_permanently_damaged(&mut self) {
        self.permanently_damaged = true;
        self.enter_fault();
    }

    pub(crate) fn is_permanently_damaged(&self) -> bool {
        self.permanently_damaged
    }

    /// Zero output immediately without leaving the online state. Used by the
    /// protective shutdown, which must act within the tick.
    pub(crate) fn curtail(&mut self) {
        if self.state == PlantState::Online {
            self.current_output_mw = 0.0;
            self.target_output_mw = 0.0;
        }
    }

    /// Begin the startup sequence. Returns false when the transition does not
    /// apply in the current state.
    pub(crate) fn request_start(&mut self) -> bool {
        if self.state == PlantState::Offline && !self.permanently_damaged {
            self.state = PlantState::Startup;
            self.transition_remaining_h = self.kind.constants().startup_h;
            true
        } else {
            false
        }
    }

    /// Begin an orderly shutdown.
    pub(crate) fn request_stop(&mut self) -> bool {
        if self.state == PlantState::Online {
            self.state = PlantState::Shutdown;
            self.transition_remaining_h = self.kind.constants().shutdown_h;
            self.current_output_mw = 0.0;
            self.target_output_mw = 0.0;
            true
        } else {
            false
        }
    }

    /// Repair a faulted or offline plant back to service. Maintenance windows
    /// cannot be repaired away; the interval must elapse.
    pub(crate) fn repair(&mut self) -> bool {
        match self.state {
            PlantState::Fault | PlantState::Offline => {
                self.permanently_damaged = false;
                self.state = PlantState::Online;
                // Resynchronises at minimum stable output; dispatch picks it
                // up from the next tick.
                self.current_output_mw = self.min_output_mw();
                self.target_output_mw = self.current_output_mw;
                true
            }
            _ => false,
        }
    }
}

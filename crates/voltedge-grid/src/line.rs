//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::config::LineSpec;
use crate::numeric::{clamp_finite, finite_or};

const SQRT_3: f64 = 1.732_050_807_568_877_2;
/// Baseline random-failure rate per operational hour for a 100 km line;
/// scales linearly with length.
const BASE_FAILURE_RATE_PER_H_PER_100KM: f64 = 2.0e-5;
const AMBIENT_TEMP_C: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    Operational,
    Tripped,
}

/// Why a line protection relay opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripReason {
    Overcurrent,
    Overvoltage,
    Undervoltage,
    Thermal,
    RandomFailure,
    Injected,
}

/// One transmission line in a grid arena.
#[derive(Debug, Clone)]
pub struct Line {
    id: u32,
    from_node: u32,
    to_node: u32,
    capacity_mw: f64,
    length_km: f64,
    resistance_ohm: f64,
    reactance_ohm: f64,
    state: LineState,
    current_flow_mw: f64,
    voltage_from_kv: f64,
    voltage_to_kv: f64,
    power_loss_mw: f64,
    thermal_rating_mw: f64,
    conductor_temp_c: f64,
    /// Scale applied on top of the derating curve; halved by cascading faults.
    rating_scale: f64,
    /// Multiplier on the telemetry reading only; physics is untouched.
    observed_flow_factor: f64,
    operational_hours: f64,
    permanently_damaged: bool,
    trip_reason: Option<TripReason>,
}

impl Line {
    pub fn from_spec(spec: &LineSpec, base_voltage_kv: f64) -> Self {
        let state = if spec.is_operational {
            LineState::Operational
        } else {
            LineState::Tripped
        };
        Self {
            id: spec.id,
            from_node: spec.from_node,
            to_node: spec.to_node,
            capacity_mw: spec.capacity_mw,
            length_km: spec.length_km,
            resistance_ohm: spec.resistance_per_km * spec.length_km,
            reactance_ohm: spec.reactance_per_km * spec.length_km,
            state,
            current_flow_mw: 0.0,
            voltage_from_kv: base_voltage_kv,
            voltage_to_kv: base_voltage_kv,
            power_loss_mw: 0.0,
            thermal_rating_mw: 1.1 * spec.capacity_mw,
            conductor_temp_c: AMBIENT_TEMP_C,
            rating_scale: 1.0,
            observed_flow_factor: 1.0,
            operational_hours: 0.0,
            permanently_damaged: false,
            trip_reason: if spec.is_operational {
                None
            } else {
                Some(TripReason::Injected)
            },
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn from_node(&self) -> u32 {
        self.from_node
    }

    pub fn to_node(&self) -> u32 {
        self.to_node
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn is_operational(&self) -> bool {
        self.state == LineState::Operational
    }

    pub fn capacity_mw(&self) -> f64 {
        self.capacity_mw
    }

    pub fn current_flow_mw(&self) -> f64 {
        self.current_flow_mw
    }

    /// Flow as reported by telemetry. Diverges from the physical flow while a
    /// cyber-attack distortion is active.
    pub fn observed_flow_mw(&self) -> f64 {
        self.current_flow_mw * self.observed_flow_factor
    }

    pub fn voltage_from_kv(&self) -> f64 {
        self.voltage_from_kv
    }

    pub fn voltage_to_kv(&self) -> f64 {
        self.voltage_to_kv
    }

    pub fn power_loss_mw(&self) -> f64 {
        self.power_loss_mw
    }

    pub fn thermal_rating_mw(&self) -> f64 {
        self.thermal_rating_mw
    }

    pub fn conductor_temp_c(&self) -> f64 {
        self.conductor_temp_c
    }

    pub fn trip_reason(&self) -> Option<TripReason> {
        self.trip_reason
    }

    pub fn impedance_ohm(&self) -> f64 {
        (self.resistance_ohm.powi(2) + self.reactance_ohm.powi(2)).sqrt()
    }

    fn rated_current_a(&self, base_kv: f64) -> f64 {
        self.capacity_mw * 1000.0 / (base_kv.max(f64::MIN_POSITIVE) * SQRT_3)
    }

    fn current_a(flow_mw: f64, voltage_kv: f64) -> f64 {
        flow_mw.abs() * 1000.0 / (voltage_kv.max(f64::MIN_POSITIVE) * SQRT_3)
    }

    /// Advance one tick using the endpoint node voltages.
    pub(crate) fn update(
        &mut self,
        v_from_kv: f64,
        v_to_kv: f64,
        base_kv: f64,
        dt_s: f64,
        failure_draw: f64,
    ) {
        if self.state == LineState::Tripped {
            self.current_flow_mw = 0.0;
            self.power_loss_mw = 0.0;
            return;
        }

        let impedance = self.impedance_ohm();
        let raw_flow_mw = if impedance > 0.0 {
            SQRT_3 * base_kv * (v_from_kv - v_to_kv) / impedance
        } else {
            0.0
        };
        // Voltage-driven flow saturates at the rating rather than tripping;
        // only explicit transfer assignments are treated as relay events.
        let rating = self.thermal_rating_mw;
        let flow = clamp_finite(raw_flow_mw, -rating, rating);
        self.settle_flow(flow, v_from_kv, base_kv);
        if self.state == LineState::Tripped {
            return;
        }

        let dt_h = dt_s / 3600.0;
        self.operational_hours += dt_h;
        let probability =
            BASE_FAILURE_RATE_PER_H_PER_100KM * (self.length_km / 100.0) * dt_h;
        if failure_draw < probability {
            self.trip(TripReason::RandomFailure);
        }
    }

    /// Assign a transfer directly. An assignment beyond the current thermal
    /// rating is a relay event and trips the line within the same tick.
    pub fn assign_flow(&mut self, flow_mw: f64, base_kv: f64) {
        if self.state == LineState::Tripped {
            return;
        }
        if flow_mw.abs() > self.thermal_rating_mw || !flow_mw.is_finite() {
            self.trip(TripReason::Thermal);
            return;
        }
        let v_from = self.voltage_from_kv;
        self.settle_flow(flow_mw, v_from, base_kv);
    }

    /// Apply a flow value: derating, saturation, voltage drop, losses,
    /// protection.
    fn settle_flow(&mut self, flow_mw: f64, v_from_kv: f64, base_kv: f64) {
        // Thermal derating from the attempted transfer: quadratic heating
        // toward 75 C, then a linear collapse of the usable rating with a
        // 50 % floor. The updated rating applies to this tick's flow.
        let attempted_a = Self::current_a(flow_mw, v_from_kv);
        let rated_a = self.rated_current_a(base_kv);
        let heating = if rated_a > 0.0 {
            (attempted_a / rated_a).powi(2)
        } else {
            0.0
        };
        self.conductor_temp_c = AMBIENT_TEMP_C + 50.0 * heating;
        let derated = if self.conductor_temp_c > 75.0 {
            self.capacity_mw * ((100.0 - self.conductor_temp_c) / 75.0).max(0.5)
        } else {
            1.1 * self.capacity_mw
        };
        self.thermal_rating_mw = derated * self.rating_scale;

        let flow = clamp_finite(flow_mw, -self.thermal_rating_mw, self.thermal_rating_mw);
        self.current_flow_mw = flow;
        self.voltage_from_kv = v_from_kv;
        self.voltage_to_kv = clamp_finite(
            v_from_kv - flow * self.resistance_ohm / 1000.0,
            0.87 * base_kv,
            1.09 * base_kv,
        );
        let current_a = Self::current_a(flow, v_from_kv);
        self.power_loss_mw = finite_or(current_a.powi(2) * self.resistance_ohm / 1e6, 0.0);

        if attempted_a > 1.2 * rated_a {
            self.trip(TripReason::Overcurrent);
        } else if v_from_kv > 1.1 * base_kv {
            self.trip(TripReason::Overvoltage);
        } else if self.voltage_to_kv < 0.9 * base_kv {
            self.trip(TripReason::Undervoltage);
        }
    }

    pub(crate) fn trip(&mut self, reason: TripReason) {
        self.state = LineState::Tripped;
        self.current_flow_mw = 0.0;
        self.power_loss_mw = 0.0;
        self.trip_reason = Some(reason);
    }

    /// Halve the usable rating; trips immediately when the present flow
    /// exceeds the reduced rating.
    pub(crate) fn halve_rating(&mut self) {
        self.rating_scale *= 0.5;
        self.thermal_rating_mw *= 0.5;
        if self.current_flow_mw.abs() > self.thermal_rating_mw {
            self.trip(TripReason::Thermal);
        }
    }

    pub(crate) fn rating_scale(&self) -> f64 {
        self.rating_scale
    }

    pub(crate) fn set_observed_flow_factor(&mut self, factor: f64) {
        self.observed_flow_factor = factor;
    }

    pub(crate) fn observed_flow_factor(&self) -> f64 {
        self.observed_flow_factor
    }

    pub(crate) fn mark_permanently_damaged(&mut self) {
        self.permanently_damaged = true;
        self.trip(TripReason::Injected);
    }

    pub(crate) fn is_permanently_damaged(&self) -> bool {
        self.permanently_damaged
    }

    /// Return a tripped line to service with a fresh rating.
    pub(crate) fn repair(&mut self) -> bool {
        if self.state == LineState::Operational {
            return false;
        }
        self.permanently_damaged = false;
        self.state = LineState::Operational;
        self.rating_scale = 1.0;
        self.observed_flow_factor = 1.0;
        self.thermal_rating_mw = 1.1 * self.capacity_mw;
        self.conductor_temp_c = AMBIENT_TEMP_C;
        self.trip_reason = None;
        true
    }
}

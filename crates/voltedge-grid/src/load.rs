//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::f64::consts::TAU;

use crate::config::LoadProfileSpec;
use crate::numeric::clamp_finite;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Demand curve for one grid: a diurnal sine over a base load, an optional
/// deterministic pseudo-random component, and a runtime surge multiplier.
///
/// Apart from the multiplier, the model is a pure function of simulation time
/// and configuration.
#[derive(Debug, Clone)]
pub struct LoadModel {
    base_load_mw: f64,
    daily_variation: f64,
    random_variation: f64,
    multiplier: f64,
}

impl LoadModel {
    pub fn from_spec(spec: &LoadProfileSpec) -> Self {
        Self {
            base_load_mw: spec.base_load_mw.max(0.0),
            daily_variation: spec.daily_variation,
            random_variation: spec.random_variation,
            multiplier: if spec.peak_multiplier.is_finite() && spec.peak_multiplier > 0.0 {
                spec.peak_multiplier
            } else {
                1.0
            },
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Runtime surge control; takes effect from the next demand evaluation.
    pub fn set_multiplier(&mut self, multiplier: f64) {
        self.multiplier = clamp_finite(multiplier, 0.0, f64::MAX);
    }

    /// Demand at the given simulation time. `noise_draw` is the tick's
    /// deterministic uniform draw in `[0, 1)`; it is ignored when the profile
    /// has no random component.
    pub fn demand_mw(&self, sim_seconds: f64, noise_draw: f64) -> f64 {
        let day_fraction = sim_seconds.rem_euclid(SECONDS_PER_DAY) / SECONDS_PER_DAY;
        let mut demand = self.base_load_mw * (1.0 + self.daily_variation * (TAU * day_fraction).sin());
        if self.random_variation != 0.0 {
            demand *= 1.0 + self.random_variation * (2.0 * noise_draw - 1.0);
        }
        clamp_finite(demand * self.multiplier, 0.0, f64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_profile() -> LoadProfileSpec {
        LoadProfileSpec {
            base_load_mw: 300.0,
            daily_variation: 0.0,
            random_variation: 0.0,
            peak_multiplier: 1.0,
        }
    }

    #[test]
    fn flat_profile_is_constant() {
        let load = LoadModel::from_spec(&flat_profile());
        assert_eq!(load.demand_mw(0.0, 0.3), 300.0);
        assert_eq!(load.demand_mw(43_200.0, 0.9), 300.0);
    }

    #[test]
    fn diurnal_sine_peaks_at_quarter_day() {
        let load = LoadModel::from_spec(&LoadProfileSpec {
            daily_variation: 0.2,
            ..flat_profile()
        });
        let peak = load.demand_mw(SECONDS_PER_DAY / 4.0, 0.5);
        assert!((peak - 360.0).abs() < 1e-6);
        let trough = load.demand_mw(3.0 * SECONDS_PER_DAY / 4.0, 0.5);
        assert!((trough - 240.0).abs() < 1e-6);
    }

    #[test]
    fn surge_multiplier_scales_demand() {
        let mut load = LoadModel::from_spec(&flat_profile());
        load.set_multiplier(35.0);
        assert_eq!(load.demand_mw(0.0, 0.5), 10_500.0);
    }

    #[test]
    fn random_component_is_bounded() {
        let load = LoadModel::from_spec(&LoadProfileSpec {
            random_variation: 0.1,
            ..flat_profile()
        });
        assert_eq!(load.demand_mw(0.0, 0.0), 270.0);
        assert!((load.demand_mw(0.0, 1.0) - 330.0).abs() < 1e-9);
        assert_eq!(load.demand_mw(0.0, 0.5), 300.0);
    }
}

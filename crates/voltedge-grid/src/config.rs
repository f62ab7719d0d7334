//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::plant::PlantKind;

fn default_base_frequency() -> f64 {
    50.0
}

fn default_base_voltage() -> f64 {
    230.0
}

fn default_efficiency() -> f64 {
    1.0
}

fn default_operational() -> bool {
    true
}

fn default_peak_multiplier() -> f64 {
    1.0
}

/// Grid topology and load profile for one simulation, as submitted to
/// `create_simulation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Nominal frequency in Hz; also the midpoint of the [45, 55] clamp.
    #[serde(default = "default_base_frequency")]
    pub base_frequency: f64,
    /// Nominal voltage in kV used for protection thresholds.
    #[serde(default = "default_base_voltage")]
    pub base_voltage: f64,
    #[serde(default)]
    pub power_plants: Vec<PlantSpec>,
    #[serde(default)]
    pub transmission_lines: Vec<LineSpec>,
    #[serde(default)]
    pub load_profile: LoadProfileSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantSpec {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: PlantKind,
    pub max_capacity_mw: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Free-form location label carried into descriptors; not used by physics.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_operational")]
    pub is_operational: bool,
    #[serde(default)]
    pub initial_output_mw: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    pub id: u32,
    pub from_node: u32,
    pub to_node: u32,
    pub capacity_mw: f64,
    pub length_km: f64,
    pub resistance_per_km: f64,
    pub reactance_per_km: f64,
    #[serde(default = "default_operational")]
    pub is_operational: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadProfileSpec {
    pub base_load_mw: f64,
    /// Amplitude of the diurnal sine, as a fraction of base load.
    #[serde(default)]
    pub daily_variation: f64,
    /// Amplitude of the per-tick pseudo-random component, as a fraction.
    #[serde(default)]
    pub random_variation: f64,
    /// Initial demand multiplier; mutable at runtime through the surge operator.
    #[serde(default = "default_peak_multiplier")]
    pub peak_multiplier: f64,
}

impl Default for LoadProfileSpec {
    fn default() -> Self {
        Self {
            base_load_mw: 0.0,
            daily_variation: 0.0,
            random_variation: 0.0,
            peak_multiplier: default_peak_multiplier(),
        }
    }
}

impl GridSpec {
    /// Validate the ConfigurationInvalid rules. A simulation is never created
    /// from a spec that fails here.
    pub fn validate(&self) -> Result<()> {
        if self.power_plants.is_empty() && self.transmission_lines.is_empty() {
            return Err(GridError::configuration(
                "grid must contain at least one plant or line",
            ));
        }
        if !(self.base_frequency.is_finite() && self.base_frequency > 0.0) {
            return Err(GridError::configuration("base_frequency must be positive"));
        }
        if !(self.base_voltage.is_finite() && self.base_voltage > 0.0) {
            return Err(GridError::configuration("base_voltage must be positive"));
        }
        if !(self.load_profile.base_load_mw.is_finite() && self.load_profile.base_load_mw >= 0.0) {
            return Err(GridError::configuration("base_load_mw must be non-negative"));
        }

        let mut plant_ids = HashSet::new();
        for plant in &self.power_plants {
            if !plant_ids.insert(plant.id) {
                return Err(GridError::configuration(format!(
                    "duplicate plant id {}",
                    plant.id
                )));
            }
            if !(plant.max_capacity_mw.is_finite() && plant.max_capacity_mw > 0.0) {
                return Err(GridError::configuration(format!(
                    "plant {} capacity must be positive",
                    plant.id
                )));
            }
            if !(plant.efficiency.is_finite() && plant.efficiency > 0.0 && plant.efficiency <= 1.0)
            {
                return Err(GridError::configuration(format!(
                    "plant {} efficiency must lie in (0, 1]",
                    plant.id
                )));
            }
        }

        let nodes: HashSet<u32> = self
            .transmission_lines
            .iter()
            .flat_map(|line| [line.from_node, line.to_node])
            .collect();
        let mut line_ids = HashSet::new();
        for line in &self.transmission_lines {
            if !line_ids.insert(line.id) {
                return Err(GridError::configuration(format!(
                    "duplicate line id {}",
                    line.id
                )));
            }
            if !(line.capacity_mw.is_finite() && line.capacity_mw > 0.0) {
                return Err(GridError::configuration(format!(
                    "line {} capacity must be positive",
                    line.id
                )));
            }
            if !(line.length_km.is_finite() && line.length_km > 0.0) {
                return Err(GridError::configuration(format!(
                    "line {} length must be positive",
                    line.id
                )));
            }
            if line.from_node == line.to_node {
                return Err(GridError::configuration(format!(
                    "line {} connects node {} to itself",
                    line.id, line.from_node
                )));
            }
            // Both endpoints are definitionally in the node set; the check
            // guards future spec fields that name nodes directly.
            debug_assert!(nodes.contains(&line.from_node) && nodes.contains(&line.to_node));
        }

        Ok(())
    }
}

impl std::str::FromStr for GridSpec {
    type Err = GridError;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let spec: GridSpec = toml::from_str(content)
            .map_err(|err| GridError::configuration(format!("spec parse failure: {err}")))?;
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_spec() -> GridSpec {
        GridSpec {
            name: Some("unit".into()),
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
            transmission_lines: Vec::new(),
            load_profile: LoadProfileSpec {
                base_load_mw: 300.0,
                ..LoadProfileSpec::default()
            },
        }
    }

    #[test]
    fn minimal_spec_validates() {
        minimal_spec().validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_plant_ids() {
        let mut spec = minimal_spec();
        spec.power_plants.push(spec.power_plants[0].clone());
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate plant id"));
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let mut spec = minimal_spec();
        spec.power_plants[0].max_capacity_mw = 0.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn parses_from_toml() {
        let spec: GridSpec = r#"
            base_frequency = 50.0
            base_voltage = 230.0

            [[power_plants]]
            id = 1
            kind = "coal"
            max_capacity_mw = 500.0
            efficiency = 0.38
            initial_output_mw = 300.0

            [load_profile]
            base_load_mw = 300.0
        "#
        .parse()
        .unwrap();
        assert_eq!(spec.power_plants.len(), 1);
        assert_eq!(spec.power_plants[0].kind, PlantKind::Coal);
    }
}

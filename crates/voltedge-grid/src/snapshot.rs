//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grid::ComponentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Condition raised during a tick and carried on its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    UnmetDemand { shortfall_mw: f64 },
    FrequencyDeviation { frequency_hz: f64 },
    ProtectiveShutdown,
    ComponentDegenerate { component: ComponentId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(flatten)]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
}

impl Alert {
    pub(crate) fn unmet_demand(shortfall_mw: f64) -> Self {
        Self {
            message: format!("demand exceeds available generation by {shortfall_mw:.1} MW"),
            kind: AlertKind::UnmetDemand { shortfall_mw },
            severity: Severity::Warning,
        }
    }

    pub(crate) fn frequency_deviation(frequency_hz: f64) -> Self {
        Self {
            message: format!("grid frequency {frequency_hz:.2} Hz outside the safe band"),
            kind: AlertKind::FrequencyDeviation { frequency_hz },
            severity: Severity::Warning,
        }
    }

    pub(crate) fn protective_shutdown() -> Self {
        Self {
            kind: AlertKind::ProtectiveShutdown,
            severity: Severity::Critical,
            message: "frequency excursion beyond 3 Hz; renewable generation curtailed".to_owned(),
        }
    }

    pub(crate) fn degenerate(component: ComponentId) -> Self {
        Self {
            message: format!("{component} produced a non-finite result and was removed"),
            kind: AlertKind::ComponentDegenerate { component },
            severity: Severity::Critical,
        }
    }
}

/// Immutable grid-wide record emitted at the end of every tick.
///
/// The field set is stable; external serialization (storage, gateways)
/// depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub simulation_id: u64,
    pub tick_number: u64,
    pub timestamp: DateTime<Utc>,
    pub total_generation_mw: f64,
    pub total_consumption_mw: f64,
    pub grid_frequency_hz: f64,
    /// Voltage at the first node.
    pub grid_voltage_kv: f64,
    pub voltage_levels_kv: Vec<f64>,
    /// `generation / consumption * 100`, bounded to `[0, 100]`.
    pub efficiency_percentage: f64,
    pub fault_count: u32,
    pub active_failure_ids: Vec<ComponentId>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl Snapshot {
    pub fn has_alert(&self, predicate: impl Fn(&AlertKind) -> bool) -> bool {
        self.alerts.iter().any(|alert| predicate(&alert.kind))
    }
}

/// Per-component telemetry sample for external metric storage. Observed
/// values are reported here, so an active cyber-attack distortion shows up in
/// these records while snapshot aggregates stay physical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetric {
    pub component: ComponentId,
    pub metric: String,
    pub value: f64,
    pub unit: String,
}

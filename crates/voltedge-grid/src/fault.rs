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
use crate::snapshot::Severity;

/// Recognized fault kinds. Injection of an incompatible pairing is rejected
/// with `UnsupportedFault` before any state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Target plant to `fault`, output zero.
    PlantOutage,
    /// Target line to `tripped`, flow zero.
    LineTrip,
    /// Every line incident to the target node trips.
    SubstationFailure,
    /// Target line's thermal rating halves; trips at once if the present
    /// flow exceeds the reduced rating.
    CascadingFailure,
    /// Plants: pinned to 10 % of capacity and marked faulted. Lines: the
    /// telemetry reading is multiplied by 1.5 while physics is untouched.
    CyberAttack,
    /// Permanent outage until an explicit repair.
    NaturalDisaster,
}

impl FaultKind {
    pub fn severity(self) -> Severity {
        match self {
            FaultKind::CyberAttack => Severity::Warning,
            FaultKind::PlantOutage | FaultKind::LineTrip => Severity::Warning,
            FaultKind::SubstationFailure
            | FaultKind::CascadingFailure
            | FaultKind::NaturalDisaster => Severity::Critical,
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FaultKind::PlantOutage => "plant_outage",
            FaultKind::LineTrip => "line_trip",
            FaultKind::SubstationFailure => "substation_failure",
            FaultKind::CascadingFailure => "cascading_failure",
            FaultKind::CyberAttack => "cyber_attack",
            FaultKind::NaturalDisaster => "natural_disaster",
        };
        f.write_str(label)
    }
}

/// Record of one applied (or no-op) injection, suitable for external fault
/// event storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultRecord {
    pub kind: FaultKind,
    pub target: ComponentId,
    pub severity: Severity,
    pub description: String,
    /// False when the target was already in the resulting state and the
    /// injection was a no-op.
    pub applied: bool,
    pub injected_at: DateTime<Utc>,
}

impl FaultRecord {
    pub(crate) fn new(
        kind: FaultKind,
        target: ComponentId,
        applied: bool,
        injected_at: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            severity: kind.severity(),
            description: description.into(),
            applied,
            injected_at,
        }
    }
}

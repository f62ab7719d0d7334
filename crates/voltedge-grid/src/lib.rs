//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! The physical model of one simulated grid: power plants, transmission
//! lines, the load curve, fault injection, and the per-tick advancement
//! pipeline that ties them together.
//!
//! Everything in this crate is single-threaded by construction; a grid is
//! owned by exactly one worker at a time and all cross-references are plain
//! integer ids into the owning arena.

pub mod config;
pub mod error;
pub mod fault;
pub mod grid;
pub mod line;
pub mod load;
pub mod numeric;
pub mod plant;
pub mod snapshot;

pub use config::{GridSpec, LineSpec, LoadProfileSpec, PlantSpec};
pub use error::{GridError, Result};
pub use fault::{FaultKind, FaultRecord};
pub use grid::{ComponentId, ComponentManifest, GridCommand, GridModel};
pub use line::{Line, LineState};
pub use load::LoadModel;
pub use plant::{Plant, PlantKind, PlantState};
pub use snapshot::{Alert, AlertKind, ComponentMetric, Severity, Snapshot};

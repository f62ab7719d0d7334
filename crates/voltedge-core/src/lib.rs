//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Primary orchestration and lifecycle management."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Orchestration for the VoltEdge engine: a map of owned simulations, one
//! worker thread per running simulation, and the programmatic control
//! surface consumed by external gateways.

pub mod error;
pub mod orchestrator;
pub mod simulation;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{EngineHealth, Orchestrator};
pub use simulation::{SimulationDescriptor, SimulationId, SimulationStatus};

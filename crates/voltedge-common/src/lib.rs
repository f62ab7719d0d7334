//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Shared primitives and utilities for the engine runtime."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
//! Shared primitives for the VoltEdge simulation engine: configuration,
//! tracing setup, the simulation clock, and the deterministic PRNG used by
//! every per-tick draw.

pub mod config;
pub mod logging;
pub mod rng;
pub mod time;

pub use config::EngineConfig;
pub use rng::SplitMix64;
pub use time::SimClock;

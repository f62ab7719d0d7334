//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Shared primitives and utilities for the engine runtime."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LoggingConfig;

fn default_tick_rate() -> Duration {
    Duration::from_millis(100)
}

fn default_max_simulations() -> usize {
    10
}

fn default_simulation_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_retention_window() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_seed_root() -> u64 {
    0x564F_4C54 // "VOLT"
}

fn default_ring_capacity() -> usize {
    4096
}

/// Primary configuration object for the VoltEdge engine runtime.
///
/// Grid topologies are not part of this object; they arrive per simulation
/// through `create_simulation` as a [`voltedge_grid`] spec blob.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick duration; drives ramping and load integration.
    #[serde(default = "default_tick_rate", rename = "tick_rate_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_rate: Duration,
    /// Ceiling on concurrently owned simulations.
    #[serde(default = "default_max_simulations")]
    pub max_simulations: usize,
    /// Wall-clock budget for a running simulation, checked at tick boundaries.
    #[serde(default = "default_simulation_timeout", rename = "simulation_timeout_s")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub simulation_timeout: Duration,
    /// Period of the terminal-simulation sweep. Zero disables the sweeper.
    #[serde(default = "default_cleanup_interval", rename = "cleanup_interval_s")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub cleanup_interval: Duration,
    /// How long terminal simulations are retained before the sweep removes them.
    #[serde(default = "default_retention_window", rename = "retention_window_s")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub retention_window: Duration,
    /// Engine-wide seed; XORed with each simulation id to derive its stream.
    #[serde(default = "default_seed_root")]
    pub seed_root: u64,
    /// Capacity of each simulation's snapshot ring (rounded up to a power of two).
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            max_simulations: default_max_simulations(),
            simulation_timeout: default_simulation_timeout(),
            cleanup_interval: default_cleanup_interval(),
            retention_window: default_retention_window(),
            seed_root: default_seed_root(),
            ring_capacity: default_ring_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub const ENV_CONFIG_PATH: &'static str = "VOLTEDGE_CONFIG";

    /// Load configuration from disk, respecting the `VOLTEDGE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::from_path(PathBuf::from(env_path));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::from_path(candidate.as_ref().to_path_buf());
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading engine configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<EngineConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate.is_zero() {
            return Err(anyhow!("tick_rate_ms must be positive"));
        }
        if self.max_simulations == 0 {
            return Err(anyhow!("max_simulations must be at least 1"));
        }
        if self.ring_capacity < 2 {
            return Err(anyhow!("ring_capacity must be at least 2"));
        }
        Ok(())
    }
}

impl std::str::FromStr for EngineConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: EngineConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

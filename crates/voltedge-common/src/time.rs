//! ---
//! ve_section: "01-core-functionality"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Shared primitives and utilities for the engine runtime."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Clock consumed by the grid model when stamping snapshots.
///
/// The deterministic variant derives `simulation_time` purely from the tick
/// counter, so two runs of the same configuration stamp identical timestamps.
#[derive(Debug, Clone)]
pub enum SimClock {
    /// Wall time; useful for interactive hosts where drift is acceptable.
    Wall,
    /// Fixed origin plus `tick * tick_step`.
    Deterministic {
        start: DateTime<Utc>,
        tick_step: Duration,
    },
}

impl SimClock {
    /// Deterministic clock anchored at `start` and advancing by `tick_step` per tick.
    pub fn deterministic(start: DateTime<Utc>, tick_step: Duration) -> Self {
        Self::Deterministic { start, tick_step }
    }

    /// Timestamp associated with the end of the given tick.
    pub fn timestamp_at(&self, tick: u64) -> DateTime<Utc> {
        match self {
            SimClock::Wall => Utc::now(),
            SimClock::Deterministic { start, tick_step } => {
                let millis = tick_step.as_millis() as i64;
                *start + chrono::Duration::milliseconds(millis.saturating_mul(tick as i64))
            }
        }
    }

    /// Seconds of simulated time elapsed at the end of the given tick.
    pub fn elapsed_seconds(&self, tick: u64) -> f64 {
        match self {
            SimClock::Wall => tick as f64,
            SimClock::Deterministic { tick_step, .. } => tick_step.as_secs_f64() * tick as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_clock_is_tick_derived() {
        let start = DateTime::from_timestamp(1_735_689_600, 0).unwrap();
        let clock = SimClock::deterministic(start, Duration::from_millis(100));
        assert_eq!(clock.timestamp_at(0), start);
        assert_eq!(
            clock.timestamp_at(10),
            start + chrono::Duration::seconds(1)
        );
        assert!((clock.elapsed_seconds(600) - 60.0).abs() < 1e-9);
    }
}

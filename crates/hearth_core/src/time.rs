//! Deterministic time system
//!
//! Fixed tick rate (60 Hz unless configured otherwise). Every tick advances
//! the clock by exactly one tick duration, so simulations replay identically.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = ~16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_duration: Duration,
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_tick_rate(TICK_RATE_HZ)
    }

    /// Clock ticking `hz` times per simulated second. A rate of zero is
    /// treated as one.
    pub fn with_tick_rate(hz: u32) -> Self {
        Self {
            tick_duration: Duration::from_secs(1) / hz.max(1),
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Tick duration in seconds, the `dt` handed to systems.
    pub fn dt_seconds(&self) -> f64 {
        self.tick_duration.as_secs_f64()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

//! Fixed-timestep driver.
//!
//! Each [`TickLoop::tick`]:
//!
//! 1. Runs every registered system in registration order, each with
//!    mutable access to the [`Stage`].
//! 2. Advances motion by `fixed_dt`, finishing steps that complete.
//! 3. Increments the tick counter.
//!
//! Systems are plain function pointers and object iteration is in slot
//! order, so with seeded randomness a run is reproducible tick for tick.
//!
//! # Example
//!
//! ```
//! use windrose_engine::prelude::*;
//!
//! let config = TickConfig { fixed_dt: 0.1, ..Default::default() };
//! let mut tick_loop = TickLoop::new(Stage::new(), config);
//! tick_loop.add_system("noop", |_stage| {});
//! tick_loop.run_ticks(10).unwrap();
//!
//! assert_eq!(tick_loop.tick_count(), 10);
//! assert!((tick_loop.sim_time() - 1.0).abs() < 1e-12);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::StageConfig;
use crate::stage::Stage;
use crate::StageError;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Upper bound on ticks run by one [`TickLoop::run_for`] call, so a long
    /// frame hitch does not stall the host catching up.
    pub max_ticks_per_frame: u32,
}

impl Default for TickConfig {
    /// 60 Hz, at most 8 catch-up ticks per frame.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_ticks_per_frame: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing of the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Time spent advancing motion.
    pub advance_time: Duration,
    /// Whole tick.
    pub total_time: Duration,
    /// Steps finished by motion during the tick.
    pub steps_finished: usize,
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// A per-tick system. Systems drive objects through the stage API.
pub type SystemFn = fn(&mut Stage);

#[derive(Debug)]
struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// Runs systems and motion at a fixed rate over one [`Stage`].
pub struct TickLoop {
    stage: Stage,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    config: TickConfig,
    /// Wall-clock time not yet consumed by [`TickLoop::run_for`].
    accumulator: f64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(stage: Stage, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            stage,
            systems: Vec::new(),
            tick_counter: 0,
            config,
            accumulator: 0.0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Build the configured stage and wrap it in a loop.
    pub fn from_config(config: &StageConfig) -> Result<Self, StageError> {
        Ok(Self::new(config.build_stage()?, config.tick.clone()))
    }

    /// Register a system to run every tick, after those already registered.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Execute one tick. Returns the number of steps finished by motion.
    pub fn tick(&mut self) -> Result<usize, StageError> {
        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());

        for system in &self.systems {
            let started = Instant::now();
            (system.func)(&mut self.stage);
            system_times.push((system.name.clone(), started.elapsed()));
        }

        let advance_start = Instant::now();
        let steps_finished = self.stage.advance(self.config.fixed_dt)?;
        let advance_time = advance_start.elapsed();

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            system_times,
            advance_time,
            total_time: tick_start.elapsed(),
            steps_finished,
        };
        Ok(steps_finished)
    }

    /// Run `count` ticks. Returns the total number of steps finished.
    pub fn run_ticks(&mut self, count: u64) -> Result<u64, StageError> {
        let mut finished = 0u64;
        for _ in 0..count {
            finished += self.tick()? as u64;
        }
        Ok(finished)
    }

    /// Consume `elapsed` seconds of host time, running as many whole ticks
    /// as fit (at most `max_ticks_per_frame`). Returns the ticks run.
    ///
    /// Leftover time carries into the next call; time beyond the per-frame
    /// cap is dropped.
    pub fn run_for(&mut self, elapsed: f64) -> Result<u32, StageError> {
        if !(elapsed >= 0.0 && elapsed.is_finite()) {
            warn!(elapsed, "ignoring invalid frame time");
            return Ok(0);
        }
        self.accumulator += elapsed;
        let mut ran = 0;
        while self.accumulator >= self.config.fixed_dt && ran < self.config.max_ticks_per_frame {
            self.tick()?;
            self.accumulator -= self.config.fixed_dt;
            ran += 1;
        }
        if self.accumulator >= self.config.fixed_dt {
            warn!(
                behind = self.accumulator,
                cap = self.config.max_ticks_per_frame,
                "frame budget exceeded, dropping time"
            );
            self.accumulator = 0.0;
        }
        Ok(ran)
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated seconds, computed as `tick_count * fixed_dt` so it does not
    /// drift.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Direct stage access for setup and host input between ticks.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// Give the stage back, dropping the systems.
    pub fn into_stage(self) -> Stage {
        self.stage
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

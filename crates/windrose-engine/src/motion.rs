//! Sub-cell progress of a step in flight.
//!
//! The core state machine only knows that a step has started and, later,
//! that it finished. [`Motion`] fills the time in between: it accumulates
//! `speed * dt` while a step is in flight and reports when the step has
//! covered a full cell, so the stage can finish it. It also remembers the
//! direction the object last faced.

use serde::{Deserialize, Serialize};
use windrose_core::direction::Direction;

/// Default step rate, in cells per second.
pub const DEFAULT_SPEED: f64 = 2.0;

/// Progress values within this distance of a full cell count as arrived.
/// Absorbs the rounding of many small `speed * dt` additions.
const ARRIVAL_EPSILON: f64 = 1e-9;

/// Per-object movement timing and facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    speed: f64,
    progress: f64,
    orientation: Direction,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            progress: 0.0,
            orientation: Direction::Down,
        }
    }
}

impl Motion {
    /// A resting motion at `speed` cells per second, facing down.
    ///
    /// Callers validate `speed`; see [`Motion::is_valid_speed`].
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    pub fn is_valid_speed(speed: f64) -> bool {
        speed > 0.0 && speed.is_finite()
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Fraction of the current step covered, in `[0, 1)`.
    #[inline]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Direction of the last step started (or the last explicit facing).
    #[inline]
    pub fn orientation(&self) -> Direction {
        self.orientation
    }

    pub(crate) fn face(&mut self, direction: Direction) {
        self.orientation = direction;
    }

    /// A step in `direction` has just been accepted.
    pub(crate) fn begin(&mut self, direction: Direction) {
        self.progress = 0.0;
        self.orientation = direction;
    }

    /// The step in flight ended (finished, cancelled, or dropped).
    pub(crate) fn reset(&mut self) {
        self.progress = 0.0;
    }

    /// Accumulate `dt` seconds. Returns `true` once the step has covered a
    /// full cell; the caller finishes it and calls [`Motion::reset`].
    pub(crate) fn advance(&mut self, dt: f64) -> bool {
        self.progress += self.speed * dt;
        if self.progress >= 1.0 - ARRIVAL_EPSILON {
            self.progress = 1.0;
            true
        } else {
            false
        }
    }

    /// Render offset, in cells, of an object moving in `movement`.
    ///
    /// Zero when not moving. Screen axes follow the grid: `+y` is down.
    pub fn offset(&self, movement: Option<Direction>) -> (f64, f64) {
        match movement {
            Some(direction) => {
                let (dx, dy) = direction.delta();
                (dx as f64 * self.progress, dy as f64 * self.progress)
            }
            None => (0.0, 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

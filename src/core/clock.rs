//! Simulation Clock
//!
//! Owned time state threaded through the frame scheduler. Created once when the
//! loop starts and mutated on every real frame.

use serde::{Deserialize, Serialize};

/// Milliseconds to seconds.
pub const MILLISECONDS_TO_SECONDS: f64 = 0.001;

/// Target substep size before any frame has been observed (seconds).
pub const INITIAL_DELTA_TIME: f64 = 1.0;

/// Simulation time state.
///
/// # Invariants
///
/// - `delta_time > 0`
/// - `accumulated_time >= 0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Adaptive target substep size (seconds).
    delta_time: f64,
    /// Real time not yet consumed by substeps (seconds).
    accumulated_time: f64,
    /// Backlog of frames the loop has fallen behind by.
    missed_frame_debt: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(INITIAL_DELTA_TIME)
    }
}

impl SimulationClock {
    /// Create a clock with the given initial substep size.
    ///
    /// Non-positive or non-finite values fall back to [`INITIAL_DELTA_TIME`].
    pub fn new(initial_delta_time: f64) -> Self {
        let delta_time = if initial_delta_time.is_finite() && initial_delta_time > 0.0 {
            initial_delta_time
        } else {
            INITIAL_DELTA_TIME
        };

        Self {
            delta_time,
            accumulated_time: 0.0,
            missed_frame_debt: 0.0,
        }
    }

    /// Current target substep size (seconds).
    #[inline]
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Unconsumed real time (seconds).
    #[inline]
    pub fn accumulated_time(&self) -> f64 {
        self.accumulated_time
    }

    /// Current missed-frame backlog.
    #[inline]
    pub fn missed_frame_debt(&self) -> f64 {
        self.missed_frame_debt
    }

    /// Add elapsed real time to the backlog.
    #[inline]
    pub(crate) fn accumulate(&mut self, dt: f64) {
        self.accumulated_time += dt;
    }

    /// Shrink the target substep toward `candidate`. Never grows.
    #[inline]
    pub(crate) fn tighten(&mut self, candidate: f64) {
        if candidate > 0.0 {
            self.delta_time = self.delta_time.min(candidate);
        }
    }

    /// Adopt an observed frame time as the new target and clear the debt.
    #[inline]
    pub(crate) fn recalibrate(&mut self, dt: f64) {
        if dt > 0.0 {
            self.delta_time = dt;
        }
        self.missed_frame_debt = 0.0;
    }

    /// Throw away the backlog, keeping exactly one substep worth of time.
    #[inline]
    pub(crate) fn reseat_backlog(&mut self) {
        self.accumulated_time = self.delta_time;
    }

    #[inline]
    pub(crate) fn add_debt(&mut self, amount: f64) {
        self.missed_frame_debt += amount;
    }

    /// Spend one substep of accumulated time.
    #[inline]
    pub(crate) fn consume_substep(&mut self) {
        self.accumulated_time = (self.accumulated_time - self.delta_time).max(0.0);
    }
}

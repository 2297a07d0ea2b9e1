//! Adaptive Frame Scheduler
//!
//! Converts irregular animation-frame deltas into zero or more fixed-size
//! simulation substeps.
//!
//! ## Per-frame algorithm
//!
//! 1. `dt = min(max_frame_seconds, raw_ms * 0.001)`; `dt <= 0` aborts the frame.
//! 2. `accumulated += dt`; the target substep shrinks to `1 / round(1 / dt)`
//!    if that is smaller. It never grows here.
//! 3. `num_frames = accumulated / delta_time`; `debt += num_frames - 1`.
//! 4. Runaway guard: `num_frames > 10` discards the backlog and runs one substep.
//! 5. Recalibration: `debt >= 10` and `dt < 1` adopts `dt` as the target.
//! 6. Decay: exactly one substep due relaxes the debt by `0.1`.
//! 7. `floor(num_frames)` substeps are emitted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::clock::{SimulationClock, INITIAL_DELTA_TIME, MILLISECONDS_TO_SECONDS};

/// Absorbs float error in `accumulated / delta_time`.
const SUBSTEP_EPSILON: f64 = 1e-9;

/// Scheduler tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Target substep before the first frame (seconds).
    pub initial_delta_time: f64,
    /// Longest real frame honoured (seconds).
    pub max_frame_seconds: f64,
    /// Backlog (in substeps) above which it is discarded.
    pub runaway_substeps: f64,
    /// Debt at which the target substep is recalibrated.
    pub recalibration_debt: f64,
    /// Debt relaxation per single-substep frame.
    pub debt_decay: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delta_time: INITIAL_DELTA_TIME,
            max_frame_seconds: 1.0,
            runaway_substeps: 10.0,
            recalibration_debt: 10.0,
            debt_decay: 0.1,
        }
    }
}

/// What one real frame should run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramePlan {
    /// Clamped real frame time (seconds).
    pub dt: f64,
    /// Substeps to emit.
    pub substeps: u32,
    /// Substep size after this frame's adjustments (seconds).
    pub step: f64,
    /// Backlog was discarded by the runaway guard.
    pub discarded_backlog: bool,
    /// Target substep was recalibrated to `dt`.
    pub recalibrated: bool,
}

/// Owns the simulation clock and plans substeps.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    clock: SimulationClock,
    config: SchedulerConfig,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl FrameScheduler {
    /// Create a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            clock: SimulationClock::new(config.initial_delta_time),
            config,
        }
    }

    /// Current clock.
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Plan a real frame of `raw_delta_ms` milliseconds.
    ///
    /// Returns `None` (state untouched) for zero, negative or NaN deltas.
    pub fn plan(&mut self, raw_delta_ms: f64) -> Option<FramePlan> {
        let dt = (raw_delta_ms * MILLISECONDS_TO_SECONDS).min(self.config.max_frame_seconds);
        if !(dt > 0.0) {
            return None;
        }

        let clock = &mut self.clock;
        clock.accumulate(dt);

        let fps = (1.0 / dt).round().max(1.0);
        clock.tighten(1.0 / fps);

        let mut num_frames = clock.accumulated_time() / clock.delta_time();
        clock.add_debt(num_frames - 1.0);

        let mut discarded_backlog = false;
        if num_frames > self.config.runaway_substeps {
            num_frames = 1.0;
            clock.reseat_backlog();
            discarded_backlog = true;
            debug!("Frame backlog discarded (dt = {:.4}s)", dt);
        }

        let substeps = (num_frames + SUBSTEP_EPSILON).floor().max(0.0) as u32;

        let mut recalibrated = false;
        if clock.missed_frame_debt() > 0.0 {
            if clock.missed_frame_debt() >= self.config.recalibration_debt && dt < 1.0 {
                clock.recalibrate(dt);
                recalibrated = true;
                if discarded_backlog {
                    clock.reseat_backlog();
                }
                debug!("Substep recalibrated to {:.4}s", dt);
            }
            if substeps == 1 {
                clock.add_debt(-self.config.debt_decay);
            }
        }

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            dt,
            substeps,
            delta_time = clock.delta_time(),
            debt = clock.missed_frame_debt(),
            "frame planned"
        );

        Some(FramePlan {
            dt,
            substeps,
            step: clock.delta_time(),
            discarded_backlog,
            recalibrated,
        })
    }

    /// Consume one substep of accumulated time.
    pub fn consume_substep(&mut self) {
        self.clock.consume_substep();
    }

    /// Plan a frame and consume all its substeps, returning how many ran.
    pub fn advance(&mut self, raw_delta_ms: f64) -> u32 {
        let Some(plan) = self.plan(raw_delta_ms) else {
            return 0;
        };
        for _ in 0..plan.substeps {
            self.consume_substep();
        }
        plan.substeps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn warmed_up(frame_ms: f64, frames: usize) -> FrameScheduler {
        let mut scheduler = FrameScheduler::default();
        for _ in 0..frames {
            scheduler.advance(frame_ms);
        }
        scheduler
    }

    #[test]
    fn test_zero_and_negative_deltas_ignored() {
        let mut scheduler = FrameScheduler::default();
        let before = *scheduler.clock();

        assert!(scheduler.plan(0.0).is_none());
        assert!(scheduler.plan(-16.0).is_none());
        assert!(scheduler.plan(f64::NAN).is_none());

        assert_eq!(*scheduler.clock(), before);
    }

    #[test]
    fn test_first_frame_sets_target() {
        let mut scheduler = FrameScheduler::default();
        let plan = scheduler.plan(1000.0 / 60.0).unwrap();

        assert!((plan.step - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(plan.substeps, 1);
    }

    #[test]
    fn test_steady_frames_emit_one_substep() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        for _ in 0..120 {
            assert_eq!(scheduler.advance(1000.0 / 60.0), 1);
        }
        assert!(scheduler.clock().accumulated_time() >= 0.0);
        assert!(scheduler.clock().accumulated_time() < scheduler.clock().delta_time());
    }

    #[test]
    fn test_slow_frame_catches_up() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        // Three frames worth of time in one callback.
        let plan = scheduler.plan(50.0).unwrap();

        assert_eq!(plan.substeps, 3);
        assert!(!plan.discarded_backlog);
        // A slow frame does not grow the target.
        assert!((plan.step - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        let before = scheduler.clock().accumulated_time();

        let substeps = scheduler.advance(25.0);
        assert_eq!(substeps, 1);

        let carried = scheduler.clock().accumulated_time();
        assert!((carried - (before + 0.025 - 1.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_runaway_guard_runs_single_substep() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        let plan = scheduler.plan(500.0).unwrap();

        assert!(plan.discarded_backlog);
        assert_eq!(plan.substeps, 1);
        // Backlog re-seated to exactly one (possibly recalibrated) substep.
        assert!((scheduler.clock().accumulated_time() - plan.step).abs() < 1e-12);

        scheduler.consume_substep();
        assert!(scheduler.clock().accumulated_time().abs() < 1e-12);
    }

    #[test]
    fn test_sustained_backlog_recalibrates() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        let mut recalibrated = None;

        // The machine drops to ~30 fps: each frame owes one extra substep.
        for frame in 0..40 {
            let plan = scheduler.plan(1000.0 / 30.0).unwrap();
            for _ in 0..plan.substeps {
                scheduler.consume_substep();
            }
            if plan.recalibrated {
                recalibrated = Some(frame);
                break;
            }
        }

        assert!(recalibrated.is_some(), "debt should reach the recalibration threshold");
        assert!((scheduler.clock().delta_time() - 1.0 / 30.0).abs() < 1e-9);
        assert!(scheduler.clock().missed_frame_debt() <= 0.0);
    }

    #[test]
    fn test_large_delta_clamped_to_one_second() {
        let mut scheduler = FrameScheduler::default();
        let plan = scheduler.plan(5000.0).unwrap();
        assert_eq!(plan.dt, 1.0);
        assert_eq!(plan.substeps, 1);
    }

    #[test]
    fn test_debt_decays_on_single_substep_frames() {
        let mut scheduler = warmed_up(1000.0 / 60.0, 10);
        scheduler.advance(50.0); // owes two frames
        let debt = scheduler.clock().missed_frame_debt();
        assert!(debt > 1.0);

        scheduler.advance(1000.0 / 60.0);
        assert!(scheduler.clock().missed_frame_debt() < debt);
    }

    proptest! {
        #[test]
        fn prop_delta_time_non_increasing_without_recalibration(
            frames in proptest::collection::vec(0.5f64..2000.0, 1..200)
        ) {
            let mut scheduler = FrameScheduler::default();
            for raw in frames {
                let before = scheduler.clock().delta_time();
                let plan = scheduler.plan(raw).unwrap();
                for _ in 0..plan.substeps {
                    scheduler.consume_substep();
                }
                let after = scheduler.clock().delta_time();
                prop_assert!(after <= before || plan.recalibrated);
                prop_assert!(after > 0.0);
                prop_assert!(scheduler.clock().accumulated_time() >= 0.0);
            }
        }

        #[test]
        fn prop_runaway_frame_emits_one_substep(warm in 1usize..30, raw in 200.0f64..5000.0) {
            let mut scheduler = warmed_up(1000.0 / 60.0, warm);
            let plan = scheduler.plan(raw).unwrap();
            if plan.discarded_backlog {
                prop_assert_eq!(plan.substeps, 1);
                prop_assert!((scheduler.clock().accumulated_time() - plan.step).abs() < 1e-12);
            }
        }
    }
}

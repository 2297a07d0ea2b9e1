//! Control Fusion
//!
//! Merges every enabled input manager into one [`ControlSignal`] per substep.
//!
//! ## Rules (in order)
//!
//! 1. `pitch`, `strafe` and `drive` are summed over all enabled managers.
//! 2. `heading` is summed over all enabled managers except the mouse.
//! 3. The mouse contributes heading once, and only while it is in physical use:
//!    - head-tracked (VR orientation active): the pointer yaw snapped to a
//!      60° wedge plus an accumulated wrap-around offset;
//!    - otherwise: its raw `heading` axis.
//! 4. Head-tracked orientation owns pitch: fused `pitch` is forced to zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::angle::{wedge_index, WEDGE};
use super::manager::Axis;
use super::registry::{ManagerRegistry, MOUSE};

/// Fused locomotion/control vector. Rebuilt from scratch every substep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSignal {
    /// Yaw (radians).
    pub heading: f64,
    /// Pitch (radians).
    pub pitch: f64,
    /// Sideways thrust.
    pub strafe: f64,
    /// Forward thrust.
    pub drive: f64,
}

impl ControlSignal {
    /// Signal with every field zero.
    pub const ZERO: Self = Self {
        heading: 0.0,
        pitch: 0.0,
        strafe: 0.0,
        drive: 0.0,
    };

    /// True when the signal requests no translation.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.strafe == 0.0 && self.drive == 0.0
    }
}

/// Wedge-snapped mouse heading used while the head is tracked.
///
/// The mouse `U` axis reports `1 - c / 2`, where `c` is the yaw correction the
/// pointer applied when it re-centred on a new wedge. Adding `1 - U` to the
/// offset each time the snapped wedge changes cancels the snap jump.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseHeading {
    wedge: i64,
    offset: f64,
}

impl MouseHeading {
    /// Heading contribution for the current pointer yaw.
    pub fn track(&mut self, pointer_yaw: f64, mouse_u: f64) -> f64 {
        let wedge = wedge_index(pointer_yaw);
        if wedge != self.wedge {
            self.offset += 1.0 - mouse_u;
            self.wedge = wedge;
        }
        wedge as f64 * WEDGE + self.offset * 2.0
    }

    /// Current snapped wedge index.
    pub fn wedge(&self) -> i64 {
        self.wedge
    }

    /// Accumulated wrap-around offset. Unbounded.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Forget the wedge and the offset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-substep input fusion.
#[derive(Debug, Default)]
pub struct InputAggregator {
    mouse_heading: MouseHeading,
    /// VR orientation was active during the previous fusion.
    head_tracked: bool,
}

impl InputAggregator {
    /// Create an aggregator with no wedge history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fuse all enabled managers into a control signal.
    ///
    /// `pointer_yaw` is the current yaw of the mouse pointer (radians); it is
    /// only read while head orientation is tracked.
    pub fn fuse(&mut self, managers: &ManagerRegistry, pointer_yaw: f64) -> ControlSignal {
        let mut signal = ControlSignal::ZERO;

        for manager in managers.iter().filter(|m| m.enabled()) {
            if manager.name() != MOUSE {
                signal.heading += manager.value(Axis::Heading);
            }
            signal.pitch += manager.value(Axis::Pitch);
            signal.strafe += manager.value(Axis::Strafe);
            signal.drive += manager.value(Axis::Drive);
        }

        let head_tracked = managers.vr_orientation();
        if self.head_tracked && !head_tracked {
            debug!("Head tracking lost, resetting mouse wedge offset");
            self.mouse_heading.reset();
        }
        self.head_tracked = head_tracked;

        if managers.has_mouse() {
            if let Some(mouse) = managers.mouse() {
                signal.heading += if head_tracked {
                    self.mouse_heading.track(pointer_yaw, mouse.value(Axis::U))
                } else {
                    mouse.value(Axis::Heading)
                };
            }
        }

        if head_tracked {
            signal.pitch = 0.0;
        }

        signal
    }

    /// Mouse wedge tracker state.
    pub fn mouse_heading(&self) -> &MouseHeading {
        &self.mouse_heading
    }

    /// Clear wedge history (zero command).
    pub fn reset(&mut self) {
        self.mouse_heading.reset();
    }
}

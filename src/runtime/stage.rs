//! Stage and Frame Collaborators
//!
//! The runtime owns no 3D math. It hands the fused control signal to a
//! [`Stage`] every substep and calls [`FrameHooks`] for per-frame work
//! (picking, UI follow, rendering).

use serde::{Deserialize, Serialize};

use crate::core::vec3::Vec3;
use crate::input::aggregator::ControlSignal;

/// Receives the fused control signal and owns the world transform.
pub trait Stage: Send {
    /// Apply one substep of control. `dt` is the real frame time (seconds).
    fn integrate(&mut self, signal: &ControlSignal, dt: f64);

    /// Current yaw of the mouse pointer (radians).
    fn pointer_yaw(&self) -> f64 {
        0.0
    }

    /// Advance pointers after the stage moved.
    fn update_pointers(&mut self) {}
}

/// Per-frame work outside the substep body.
pub trait FrameHooks: Send {
    /// Resolve what the pointers are over. First substep of a frame only.
    fn resolve_picking(&mut self) {}

    /// Move UI that follows the user. First substep of a frame only.
    fn follow_ui(&mut self, _dt: f64) {}

    /// Present the frame. Once per real frame, after the substeps.
    fn render(&mut self) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl FrameHooks for NoHooks {}

/// Pose produced by [`PlanarStage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePose {
    /// Stage position.
    pub position: Vec3,
    /// Yaw (radians).
    pub yaw: f64,
    /// Pitch (radians).
    pub pitch: f64,
}

/// Ground-plane stage: orientation follows the signal, velocity
/// `(strafe, 0, drive)` is rotated by yaw and integrated.
#[derive(Clone, Debug, Default)]
pub struct PlanarStage {
    pose: StagePose,
    /// Height of the viewer above the ground.
    avatar_height: f64,
    /// Pointer yaw fed in by the host.
    pointer_yaw: f64,
    pointer_updates: u64,
}

impl PlanarStage {
    /// Stage at the origin.
    pub fn new(avatar_height: f64) -> Self {
        Self {
            pose: StagePose {
                position: Vec3::new(0.0, avatar_height, 0.0),
                ..StagePose::default()
            },
            avatar_height,
            ..Self::default()
        }
    }

    /// Current pose.
    pub fn pose(&self) -> StagePose {
        self.pose
    }

    /// Set the pointer yaw reported to the aggregator.
    pub fn set_pointer_yaw(&mut self, yaw: f64) {
        self.pointer_yaw = yaw;
    }

    /// How many times pointers were advanced.
    pub fn pointer_updates(&self) -> u64 {
        self.pointer_updates
    }
}

impl Stage for PlanarStage {
    fn integrate(&mut self, signal: &ControlSignal, dt: f64) {
        self.pose.yaw = signal.heading;
        self.pose.pitch = signal.pitch;

        let velocity = Vec3::new(signal.strafe, 0.0, signal.drive);
        self.pose.position += velocity.scale(dt).rotate_y(self.pose.yaw);
        self.pose.position.y = self.avatar_height;
    }

    fn pointer_yaw(&self) -> f64 {
        self.pointer_yaw
    }

    fn update_pointers(&mut self) {
        self.pointer_updates += 1;
    }
}

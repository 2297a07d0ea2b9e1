//! Angle helpers for pointer yaw handling.

use std::f64::consts::PI;

/// Width of one heading wedge (60 degrees).
pub const WEDGE: f64 = PI / 3.0;

/// Index of the wedge nearest to `yaw` (radians).
///
/// Wedge 0 is centered on zero, so boundaries sit at odd multiples of `WEDGE / 2`.
#[inline]
pub fn wedge_index(yaw: f64) -> i64 {
    (yaw / WEDGE + 0.5).floor() as i64
}

/// Snap `yaw` to the center of its nearest wedge.
#[inline]
pub fn snap_to_wedge(yaw: f64) -> f64 {
    wedge_index(yaw) as f64 * WEDGE
}

//! Input Manager Capability
//!
//! The device abstraction consumed by the runtime. Concrete devices (keyboard,
//! mouse, touch, tracked VR hardware) live with the host; the runtime only
//! depends on [`InputManager`].

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// Named continuous axis exposed by an input manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Yaw contribution (radians).
    Heading,
    /// Pitch contribution (radians).
    Pitch,
    /// Sideways thrust.
    Strafe,
    /// Forward thrust.
    Drive,
    /// Horizontal pointer coordinate.
    U,
    /// Vertical pointer coordinate.
    V,
}

impl Axis {
    /// Every axis, in declaration order.
    pub const ALL: [Axis; 6] = [
        Axis::Heading,
        Axis::Pitch,
        Axis::Strafe,
        Axis::Drive,
        Axis::U,
        Axis::V,
    ];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Heading => "heading",
            Axis::Pitch => "pitch",
            Axis::Strafe => "strafe",
            Axis::Drive => "drive",
            Axis::U => "U",
            Axis::V => "V",
        };
        f.write_str(name)
    }
}

/// Polymorphic input device.
///
/// Managers are identified by [`InputManager::name`]; the registry holds at
/// most one manager per name.
pub trait InputManager: Send {
    /// Unique manager name (e.g. `"Keyboard"`, `"Mouse"`).
    fn name(&self) -> &str;

    /// Whether the manager contributes to control fusion.
    fn enabled(&self) -> bool;

    /// Enable or disable the whole manager.
    fn set_enabled(&mut self, enabled: bool);

    /// Whether the user is physically operating this device.
    fn in_physical_use(&self) -> bool;

    /// Mark the device as (not) being operated.
    fn set_in_physical_use(&mut self, in_use: bool);

    /// Current value of an axis. Gated-off axes read as zero.
    fn value(&self, axis: Axis) -> f64;

    /// Gate a single axis on or off.
    fn set_axis_enabled(&mut self, axis: Axis, enabled: bool);

    /// True for tracked devices that currently report head orientation.
    fn has_orientation(&self) -> bool {
        false
    }

    /// Reset accumulated sensor state.
    fn zero(&mut self);

    /// Per-substep update with the frame's elapsed time (seconds).
    fn update(&mut self, dt: f64);
}

/// Value-backed input manager.
///
/// Holds the latest raw value for each axis; the host writes values from its
/// own device callbacks with [`AxisInput::set_value`]. Also used by the demo
/// binary and the tests as a stand-in for real devices.
#[derive(Clone, Debug)]
pub struct AxisInput {
    name: String,
    enabled: bool,
    in_physical_use: bool,
    has_orientation: bool,
    values: BTreeMap<Axis, f64>,
    gated: BTreeMap<Axis, bool>,
    /// Per-second change applied to each axis on update.
    rates: BTreeMap<Axis, f64>,
    updates: u64,
}

impl AxisInput {
    /// Create an enabled manager that is in physical use, all axes at zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            in_physical_use: true,
            has_orientation: false,
            values: BTreeMap::new(),
            gated: BTreeMap::new(),
            rates: BTreeMap::new(),
            updates: 0,
        }
    }

    /// Builder: set an axis value.
    pub fn with_value(mut self, axis: Axis, value: f64) -> Self {
        self.values.insert(axis, value);
        self
    }

    /// Builder: integrate `rate` per second into `axis` on every update.
    pub fn with_rate(mut self, axis: Axis, rate: f64) -> Self {
        self.rates.insert(axis, rate);
        self
    }

    /// Builder: report head orientation.
    pub fn with_orientation(mut self, has_orientation: bool) -> Self {
        self.has_orientation = has_orientation;
        self
    }

    /// Builder: physical use flag.
    pub fn in_use(mut self, in_use: bool) -> Self {
        self.in_physical_use = in_use;
        self
    }

    /// Overwrite the raw value of an axis.
    pub fn set_value(&mut self, axis: Axis, value: f64) {
        self.values.insert(axis, value);
    }

    /// Set whether this device reports head orientation.
    pub fn set_orientation(&mut self, has_orientation: bool) {
        self.has_orientation = has_orientation;
    }

    /// Raw value, ignoring gating.
    pub fn raw_value(&self, axis: Axis) -> f64 {
        self.values.get(&axis).copied().unwrap_or(0.0)
    }

    /// Whether `axis` is currently gated on.
    pub fn axis_enabled(&self, axis: Axis) -> bool {
        self.gated.get(&axis).copied().unwrap_or(true)
    }

    /// Number of updates received.
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

impl InputManager for AxisInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn in_physical_use(&self) -> bool {
        self.in_physical_use
    }

    fn set_in_physical_use(&mut self, in_use: bool) {
        self.in_physical_use = in_use;
    }

    fn value(&self, axis: Axis) -> f64 {
        if self.axis_enabled(axis) {
            self.raw_value(axis)
        } else {
            0.0
        }
    }

    fn set_axis_enabled(&mut self, axis: Axis, enabled: bool) {
        self.gated.insert(axis, enabled);
    }

    fn has_orientation(&self) -> bool {
        self.has_orientation
    }

    fn zero(&mut self) {
        self.values.clear();
    }

    fn update(&mut self, dt: f64) {
        self.updates += 1;
        for (axis, rate) in &self.rates {
            *self.values.entry(*axis).or_insert(0.0) += rate * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_input_defaults() {
        let input = AxisInput::new("Keyboard");
        assert_eq!(input.name(), "Keyboard");
        assert!(input.enabled());
        assert!(input.in_physical_use());
        assert!(!input.has_orientation());
        for axis in Axis::ALL {
            assert_eq!(input.value(axis), 0.0);
        }
    }

    #[test]
    fn test_axis_gating() {
        let mut mouse = AxisInput::new("Mouse").with_value(Axis::Heading, 0.5);
        assert_eq!(mouse.value(Axis::Heading), 0.5);

        mouse.set_axis_enabled(Axis::Heading, false);
        assert_eq!(mouse.value(Axis::Heading), 0.0);
        assert_eq!(mouse.raw_value(Axis::Heading), 0.5);

        mouse.set_axis_enabled(Axis::Heading, true);
        assert_eq!(mouse.value(Axis::Heading), 0.5);
    }

    #[test]
    fn test_update_integrates_rates() {
        let mut input = AxisInput::new("Gamepad_0").with_rate(Axis::Heading, 2.0);
        input.update(0.25);
        input.update(0.25);
        assert_eq!(input.value(Axis::Heading), 1.0);
        assert_eq!(input.update_count(), 2);
    }

    #[test]
    fn test_zero_clears_values() {
        let mut input = AxisInput::new("Touch").with_value(Axis::Drive, 1.0);
        input.zero();
        assert_eq!(input.value(Axis::Drive), 0.0);
    }

    #[test]
    fn test_axis_display() {
        assert_eq!(Axis::Heading.to_string(), "heading");
        assert_eq!(Axis::U.to_string(), "U");
    }
}

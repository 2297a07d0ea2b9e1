//! Input
//!
//! Device managers and their fusion into one control signal.
//!
//! ## Module Structure
//!
//! - `manager`: the input manager contract and a value-backed implementation
//! - `registry`: managers keyed by name, gamepad takeover
//! - `aggregator`: fusion rules and mouse wedge tracking

pub mod aggregator;
pub mod manager;
pub mod registry;

pub use aggregator::{ControlSignal, InputAggregator, MouseHeading};
pub use manager::{Axis, AxisInput, InputManager};
pub use registry::{BoxedManager, ManagerRegistry};

//! Core primitives.
//!
//! Plain value types shared by the scheduler, input fusion and stage code.

pub mod angle;
pub mod clock;
pub mod vec3;

pub use angle::{snap_to_wedge, wedge_index, WEDGE};
pub use clock::SimulationClock;
pub use vec3::Vec3;

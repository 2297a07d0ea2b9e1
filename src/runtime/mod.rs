//! Runtime
//!
//! The frame loop and everything that drives it.
//!
//! ## Module Structure
//!
//! - `scheduler`: adaptive fixed-substep planning
//! - `events`: observer notifications with fault isolation
//! - `stage`: collaborator traits for world transform and per-frame work
//! - `environment`: owns the loop state and runs substeps
//! - `driver`: async loop running installation alongside frames

pub mod driver;
pub mod environment;
pub mod events;
pub mod scheduler;
pub mod stage;

pub use driver::{run, DriverError, RunSummary};
pub use environment::{Environment, FrameReport};
pub use events::{EventBus, RuntimeEvent, SubscriptionId};
pub use scheduler::{FramePlan, FrameScheduler, SchedulerConfig};
pub use stage::{FrameHooks, NoHooks, PlanarStage, Stage, StagePose};

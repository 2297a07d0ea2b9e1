//! # Presence Runtime
//!
//! Core of a real-time presentation loop: adaptive frame scheduling, input
//! fusion, pointer focus routing and asynchronous plugin installation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PRESENCE RUNTIME                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Value types                            │
//! │  ├── clock.rs       - Simulation clock state                 │
//! │  ├── angle.rs       - Heading wedges                         │
//! │  └── vec3.rs        - 3-vector                               │
//! │                                                              │
//! │  input/             - Device input                           │
//! │  ├── manager.rs     - Input manager contract                 │
//! │  ├── registry.rs    - Managers by name, gamepad takeover     │
//! │  └── aggregator.rs  - Fusion into a control signal           │
//! │                                                              │
//! │  focus.rs           - Pointer focus arbitration              │
//! │                                                              │
//! │  plugin/            - Extension units                        │
//! │  └── lifecycle.rs   - Install queue with bounded retry       │
//! │                                                              │
//! │  runtime/           - Frame loop                             │
//! │  ├── scheduler.rs   - Adaptive fixed substeps                │
//! │  ├── events.rs      - Observer notifications                 │
//! │  ├── stage.rs       - Stage / render collaborators           │
//! │  ├── environment.rs - Loop state and substep body            │
//! │  └── driver.rs      - Async loop + install phase             │
//! │                                                              │
//! │  config.rs          - Runtime configuration                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! One task owns the [`Environment`] and mutates it through `&mut self`.
//! Plugin installs run on that same task, interleaved with frames by the
//! driver, never concurrently with a substep.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod focus;
pub mod input;
pub mod plugin;
pub mod runtime;

// Re-export commonly used types
pub use config::{ConfigError, RuntimeConfig};
pub use focus::{FocusRouter, FocusTarget, PointerEvent, PointerEventKind};
pub use input::{Axis, AxisInput, ControlSignal, InputManager};
pub use plugin::{Plugin, PluginContext, PluginError, PluginLifecycleManager};
pub use runtime::{Environment, FrameScheduler, PlanarStage, RuntimeEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

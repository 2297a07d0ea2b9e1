//! Plugins
//!
//! Optional extension units installed asynchronously at startup.
//!
//! ## Module Structure
//!
//! - `lifecycle`: FIFO install queue with bounded retry and an install report

pub mod lifecycle;

use std::collections::BTreeSet;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::input::aggregator::ControlSignal;

pub use lifecycle::{InstallOutcome, InstallReport, InstallState, PluginLifecycleManager};

/// Retry budget used when a plugin does not declare one.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Boxed plugin.
pub type BoxedPlugin = Box<dyn Plugin>;

/// Extension unit with declared requirements.
///
/// Requirements are plain strings checked against the capabilities recorded
/// in the shared [`PluginContext`]; plugins never reference each other.
pub trait Plugin: Send {
    /// Plugin name (for logs and reports).
    fn name(&self) -> &str;

    /// Number of requeues allowed while requirements are unmet.
    fn retry_budget(&self) -> u32 {
        DEFAULT_RETRY_BUDGET
    }

    /// Names of requirements missing from `ctx`. Empty means installable.
    fn requirements_met(&self, ctx: &PluginContext) -> Vec<String>;

    /// Install into `ctx`, returning further plugins to queue.
    fn install<'a>(
        &'a mut self,
        ctx: &'a mut PluginContext,
    ) -> BoxFuture<'a, Result<Vec<BoxedPlugin>, PluginError>>;

    /// Called when animation (re)starts.
    fn start(&mut self) -> BoxFuture<'_, Result<(), PluginError>> {
        Box::pin(async { Ok(()) })
    }

    /// Called when animation stops.
    fn stop(&mut self) {}

    /// Called once per real frame, before the substeps.
    fn pre_update(&mut self, _ctx: &PluginContext, _dt: f64) {}

    /// Called once per real frame, after the substeps.
    fn post_update(&mut self, _ctx: &PluginContext, _dt: f64) {}
}

/// Shared state plugins check requirements against and install into.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PluginContext {
    capabilities: BTreeSet<String>,
    installed: Vec<String>,
    /// Most recent fused control signal.
    pub control: ControlSignal,
    /// Whether a VR display is presenting.
    pub presenting: bool,
}

impl PluginContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-seeded with capabilities.
    pub fn with_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Record a capability.
    pub fn provide(&mut self, capability: impl Into<String>) {
        self.capabilities.insert(capability.into());
    }

    /// Whether a capability is present.
    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Requirements from `required` that are not present.
    pub fn missing<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|r| !self.has(r))
            .map(str::to_string)
            .collect()
    }

    /// All capabilities.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    /// Names of installed plugins, in install order.
    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    pub(crate) fn mark_installed(&mut self, name: &str) {
        self.installed.push(name.to_string());
    }
}

/// Plugin errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PluginError {
    /// Installation failed.
    #[error("install failed: {0}")]
    Install(String),

    /// Start failed.
    #[error("start failed: {0}")]
    Start(String),
}

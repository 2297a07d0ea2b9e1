//! Plugin Installation
//!
//! A single FIFO work queue drained one plugin at a time:
//!
//! 1. Dequeue the head plugin.
//! 2. Missing requirements empty → install. Returned plugins go to the tail.
//!    An install error drops the plugin; the queue keeps going.
//! 3. Requirements missing and budget left → decrement, requeue at the tail.
//! 4. Requirements missing and budget spent → drop.
//!
//! A plugin with budget `n` is checked at most `n + 1` times. Requeueing to the
//! tail means a plugin waiting on a capability never blocks the ones behind it.

use std::collections::VecDeque;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{BoxedPlugin, PluginContext};

/// Install state of one queued plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallState {
    /// Queued, not yet checked.
    Pending,
    /// Install future running.
    Installing,
    /// Requirements unmet, requeued.
    Retrying,
    /// Given up on.
    Dropped,
    /// Installed successfully.
    Installed,
}

impl InstallState {
    /// Whether the plugin has left the queue for good.
    pub fn is_final(self) -> bool {
        matches!(self, InstallState::Dropped | InstallState::Installed)
    }
}

/// Diagnostics for one queued plugin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PluginStatus {
    /// Plugin name.
    pub name: String,
    /// Current state.
    pub state: InstallState,
    /// Requirement checks performed.
    pub checks: u32,
    /// Requeues still allowed.
    pub retries_left: u32,
    /// Requirements missing at the last check.
    pub missing: Vec<String>,
    /// Install error, if the install failed.
    pub error: Option<String>,
    /// When the plugin reached a final state.
    pub finished_at: Option<DateTime<Utc>>,
}

/// Snapshot of every plugin the queue has seen, in first-enqueue order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstallReport {
    /// Per-plugin status.
    pub entries: Vec<PluginStatus>,
}

impl InstallReport {
    /// Entries that installed.
    pub fn installed(&self) -> impl Iterator<Item = &PluginStatus> {
        self.entries.iter().filter(|e| e.state == InstallState::Installed)
    }

    /// Entries that were dropped.
    pub fn dropped(&self) -> impl Iterator<Item = &PluginStatus> {
        self.entries.iter().filter(|e| e.state == InstallState::Dropped)
    }

    /// Status of the first plugin with `name`.
    pub fn get(&self, name: &str) -> Option<&PluginStatus> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Strict mode: fail if any plugin was dropped.
    pub fn into_strict(self) -> Result<Self, InstallError> {
        let failures: Vec<PluginFailure> = self
            .dropped()
            .map(|e| PluginFailure {
                name: e.name.clone(),
                reason: match &e.error {
                    Some(err) => err.clone(),
                    None => format!("missing requirements: [{}]", e.missing.join(", ")),
                },
            })
            .collect();

        if failures.is_empty() {
            Ok(self)
        } else {
            Err(InstallError::PluginsDropped(failures))
        }
    }
}

/// One dropped plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFailure {
    /// Plugin name.
    pub name: String,
    /// Why it was dropped.
    pub reason: String,
}

/// Install phase errors (strict mode only).
#[derive(Debug, Clone, thiserror::Error)]
pub enum InstallError {
    /// Some plugins never installed.
    #[error("{} plugin(s) dropped", .0.len())]
    PluginsDropped(Vec<PluginFailure>),
}

/// Result of draining the queue.
pub struct InstallOutcome {
    /// Installed plugins, in install order.
    pub plugins: Vec<BoxedPlugin>,
    /// Context after every install ran.
    pub context: PluginContext,
    /// Per-plugin diagnostics.
    pub report: InstallReport,
}

struct QueuedPlugin {
    /// Index into `statuses`.
    ticket: usize,
    plugin: BoxedPlugin,
}

/// Drives plugins through the install state machine.
#[derive(Default)]
pub struct PluginLifecycleManager {
    queue: VecDeque<QueuedPlugin>,
    statuses: Vec<PluginStatus>,
    installed: Vec<BoxedPlugin>,
}

impl PluginLifecycleManager {
    /// Seed the queue with the configured plugins.
    pub fn new(plugins: Vec<BoxedPlugin>) -> Self {
        let mut manager = Self::default();
        for plugin in plugins {
            manager.enqueue(plugin);
        }
        manager
    }

    /// Append a plugin to the tail of the queue.
    pub fn enqueue(&mut self, plugin: BoxedPlugin) {
        let ticket = self.statuses.len();
        self.statuses.push(PluginStatus {
            name: plugin.name().to_string(),
            state: InstallState::Pending,
            checks: 0,
            retries_left: plugin.retry_budget(),
            missing: Vec::new(),
            error: None,
            finished_at: None,
        });
        self.queue.push_back(QueuedPlugin { ticket, plugin });
    }

    /// Plugins still queued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Diagnostics snapshot.
    pub fn report(&self) -> InstallReport {
        InstallReport {
            entries: self.statuses.clone(),
        }
    }

    /// Process the head of the queue. Returns `false` once the queue is empty.
    pub async fn step(&mut self, ctx: &mut PluginContext) -> bool {
        let Some(QueuedPlugin { ticket, mut plugin }) = self.queue.pop_front() else {
            return false;
        };

        let missing = plugin.requirements_met(ctx);
        let status = &mut self.statuses[ticket];
        status.checks += 1;
        status.missing = missing.clone();

        if missing.is_empty() {
            status.state = InstallState::Installing;
            debug!("Installing plugin {}", status.name);

            match plugin.install(ctx).await {
                Ok(spawned) => {
                    let status = &mut self.statuses[ticket];
                    status.state = InstallState::Installed;
                    status.finished_at = Some(Utc::now());
                    info!("Installed plugin {} ({} spawned)", status.name, spawned.len());
                    ctx.mark_installed(plugin.name());
                    self.installed.push(plugin);
                    for child in spawned {
                        self.enqueue(child);
                    }
                }
                Err(e) => {
                    let status = &mut self.statuses[ticket];
                    error!("Error while installing {}: {}", status.name, e);
                    status.state = InstallState::Dropped;
                    status.error = Some(e.to_string());
                    status.finished_at = Some(Utc::now());
                }
            }
        } else if status.retries_left > 0 {
            status.retries_left -= 1;
            status.state = InstallState::Retrying;
            warn!(
                "Couldn't install {}. Missing requirements: [{}]. Will retry later.",
                status.name,
                missing.join(", ")
            );
            self.queue.push_back(QueuedPlugin { ticket, plugin });
        } else {
            status.state = InstallState::Dropped;
            status.finished_at = Some(Utc::now());
            error!(
                "Couldn't install {}. Missing requirements: [{}]. Will not retry.",
                status.name,
                missing.join(", ")
            );
        }

        true
    }

    /// Drain the whole queue, yielding to the scheduler between items.
    pub async fn drain(&mut self, ctx: &mut PluginContext) {
        while self.step(ctx).await {
            tokio::task::yield_now().await;
        }
    }

    /// Drain the queue and hand over everything that installed.
    pub async fn install_all(mut self, mut ctx: PluginContext) -> InstallOutcome {
        self.drain(&mut ctx).await;
        let report = self.report();
        info!(
            "Plugin install phase complete: {} installed, {} dropped",
            report.installed().count(),
            report.dropped().count()
        );
        InstallOutcome {
            plugins: self.installed,
            context: ctx,
            report,
        }
    }
}

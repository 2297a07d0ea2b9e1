//! Async Frame Driver
//!
//! Runs the plugin install phase and the frame loop on one task. Frames keep
//! ticking while plugins install; `ready` fires once the queue drains.

use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::plugin::lifecycle::InstallError;
use crate::plugin::{BoxedPlugin, InstallReport, PluginLifecycleManager};
use super::environment::Environment;

/// Driver errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    /// Strict mode and some plugins were dropped.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The environment was stopped permanently before the run started.
    #[error("environment cannot be restarted")]
    NotRestartable,
}

/// Totals for a finished run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Real frames processed.
    pub frames: u64,
    /// Substeps processed.
    pub substeps: u64,
    /// Install diagnostics.
    pub report: InstallReport,
}

/// Install `plugins` and animate `env` until it has processed `max_frames`
/// frames (or forever when `None`).
///
/// The loop never exits before installation finished. With
/// `strict_plugins` set, a dropped plugin stops `env` (restart allowed) and
/// aborts the run.
pub async fn run(
    env: &mut Environment,
    plugins: Vec<BoxedPlugin>,
    max_frames: Option<u64>,
) -> Result<RunSummary, DriverError> {
    let strict = env.config().strict_plugins;
    let period = Duration::from_millis(env.config().frame_interval_ms.max(1));

    if !env.start().await {
        return Err(DriverError::NotRestartable);
    }

    let install = PluginLifecycleManager::new(plugins).install_all(env.plugin_context());
    tokio::pin!(install);
    let mut installing = true;

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;
    let mut last = Instant::now();
    let start_frames = env.frame_count();
    let start_substeps = env.substep_count();

    loop {
        tokio::select! {
            outcome = &mut install, if installing => {
                installing = false;
                let report = outcome.report.clone();
                env.attach_plugins(outcome).await;
                if strict {
                    if let Err(e) = report.into_strict() {
                        env.stop(true);
                        return Err(e.into());
                    }
                }
            }
            now = ticker.tick() => {
                if env.is_running() {
                    let elapsed = now.duration_since(last);
                    env.advance(elapsed.as_secs_f64() * 1000.0);
                }
                // Re-based while paused so resuming does not see the gap.
                last = now;
            }
        }

        let done = max_frames.is_some_and(|max| env.frame_count() - start_frames >= max);
        if done && !installing {
            break;
        }
    }

    let report = env.install_report().cloned().unwrap_or_default();
    if report.dropped().next().is_some() {
        warn!("{} plugins dropped", report.dropped().count());
    }
    let summary = RunSummary {
        frames: env.frame_count() - start_frames,
        substeps: env.substep_count() - start_substeps,
        report,
    };
    info!("Run finished: {} frames, {} substeps", summary.frames, summary.substeps);
    Ok(summary)
}

//! Presentation Environment
//!
//! Owns everything the frame loop mutates: the scheduler clock, the input
//! manager registry, the fusion state, the focus router, observers, the stage
//! and the installed plugins. All mutation goes through `&mut self`, so a
//! single owning task serializes it.
//!
//! ## Substep body
//!
//! ```text
//! for each substep:
//!   managers.update(dt) → fuse → stage.integrate → pointers
//!   first substep only: resolve picking, follow UI
//!   emit "update"
//! ```

use tracing::{debug, error, info};

use crate::config::RuntimeConfig;
use crate::core::clock::SimulationClock;
use crate::focus::{FocusChange, FocusRouter, PointerEvent};
use crate::input::aggregator::{ControlSignal, InputAggregator};
use crate::input::registry::{BoxedManager, ManagerRegistry, KEYBOARD};
use crate::plugin::{BoxedPlugin, InstallOutcome, InstallReport, PluginContext};
use super::events::{EventBus, RuntimeEvent, SubscriptionId};
use super::scheduler::{FramePlan, FrameScheduler};
use super::stage::{FrameHooks, NoHooks, Stage};

/// Capability recorded when some manager tracks head orientation.
pub const VR_CAPABILITY: &str = "vr";

/// Outcome of one real frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Scheduler plan, `None` when the frame was skipped.
    pub plan: Option<FramePlan>,
    /// Substeps executed.
    pub substeps: u32,
    /// Observer failures during this frame.
    pub observer_faults: usize,
}

/// The runtime core.
pub struct Environment {
    config: RuntimeConfig,
    scheduler: FrameScheduler,
    managers: ManagerRegistry,
    aggregator: InputAggregator,
    focus: FocusRouter,
    bus: EventBus,
    stage: Box<dyn Stage>,
    hooks: Box<dyn FrameHooks>,
    plugins: Vec<BoxedPlugin>,
    plugin_ctx: PluginContext,
    install_report: Option<InstallReport>,
    control: ControlSignal,
    presenting: bool,
    running: bool,
    allow_restart: bool,
    ready: bool,
    frames: u64,
    substeps: u64,
}

impl Environment {
    /// Create a stopped environment with no frame hooks.
    pub fn new(config: RuntimeConfig, stage: Box<dyn Stage>) -> Self {
        Self::with_hooks(config, stage, Box::new(NoHooks))
    }

    /// Create a stopped environment.
    pub fn with_hooks(config: RuntimeConfig, stage: Box<dyn Stage>, hooks: Box<dyn FrameHooks>) -> Self {
        let scheduler = FrameScheduler::new(config.scheduler.clone());
        let presenting = config.vr_presenting;
        Self {
            config,
            scheduler,
            managers: ManagerRegistry::new(),
            aggregator: InputAggregator::new(),
            focus: FocusRouter::new(),
            bus: EventBus::new(),
            stage,
            hooks,
            plugins: Vec::new(),
            plugin_ctx: PluginContext::new(),
            install_report: None,
            control: ControlSignal::ZERO,
            presenting,
            running: false,
            allow_restart: true,
            ready: false,
            frames: 0,
            substeps: 0,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Simulation clock.
    pub fn clock(&self) -> &SimulationClock {
        self.scheduler.clock()
    }

    /// Input managers.
    pub fn managers(&self) -> &ManagerRegistry {
        &self.managers
    }

    /// Input managers, mutably.
    pub fn managers_mut(&mut self) -> &mut ManagerRegistry {
        &mut self.managers
    }

    /// Focus router.
    pub fn focus(&self) -> &FocusRouter {
        &self.focus
    }

    /// Control signal fused on the last substep.
    pub fn control(&self) -> ControlSignal {
        self.control
    }

    /// Fusion state.
    pub fn aggregator(&self) -> &InputAggregator {
        &self.aggregator
    }

    /// Whether the focused target locks movement.
    pub fn lock_movement(&self) -> bool {
        self.focus.lock_movement()
    }

    /// Whether frames are being processed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether `ready` has fired.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Real frames processed.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Substeps processed.
    pub fn substep_count(&self) -> u64 {
        self.substeps
    }

    /// Installed plugins.
    pub fn plugins(&self) -> &[BoxedPlugin] {
        &self.plugins
    }

    /// Diagnostics from the install phase, once it finished.
    pub fn install_report(&self) -> Option<&InstallReport> {
        self.install_report.as_ref()
    }

    /// Set whether a VR display is presenting.
    pub fn set_presenting(&mut self, presenting: bool) {
        self.presenting = presenting;
        self.plugin_ctx.presenting = presenting;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an input manager, evicting any manager with the same name.
    pub fn add_input_manager(&mut self, manager: BoxedManager) -> Option<BoxedManager> {
        if self.config.disable_keyboard && manager.name() == KEYBOARD {
            debug!("Keyboard disabled by configuration, not registering");
            return None;
        }
        self.managers.register(manager)
    }

    /// Remove an input manager by name.
    pub fn remove_input_manager(&mut self, name: &str) -> Option<BoxedManager> {
        self.managers.remove(name)
    }

    /// Register an observer for runtime notifications.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&RuntimeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.bus.subscribe(observer)
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Context for the install phase: one capability per registered manager
    /// name, plus [`VR_CAPABILITY`] when head orientation is tracked.
    pub fn plugin_context(&self) -> PluginContext {
        let mut ctx = self.plugin_ctx.clone();
        for name in self.managers.names() {
            ctx.provide(name);
        }
        if self.managers.vr_orientation() {
            ctx.provide(VR_CAPABILITY);
        }
        ctx.presenting = self.presenting;
        ctx
    }

    /// Take over the result of the install phase and fire `ready`.
    ///
    /// Plugins are started right away when the loop is already running.
    pub async fn attach_plugins(&mut self, outcome: InstallOutcome) {
        let InstallOutcome { plugins, context, report } = outcome;
        let first_new = self.plugins.len();
        self.plugins.extend(plugins);
        self.plugin_ctx = context;
        // The install-time snapshot may predate a presentation change.
        self.plugin_ctx.presenting = self.presenting;
        self.install_report = Some(report);

        if self.running {
            self.start_plugins(first_new).await;
        }

        if !self.ready {
            self.ready = true;
            info!("Environment ready ({} plugins)", self.plugins.len());
            self.bus.emit(RuntimeEvent::Ready);
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start (or resume) animation. Returns `false` after a permanent stop.
    ///
    /// The clock is left as it was: backlog accumulated before a pause is
    /// still owed after resuming.
    pub async fn start(&mut self) -> bool {
        if !self.allow_restart {
            return false;
        }
        self.running = true;
        if self.ready {
            self.start_plugins(0).await;
        }
        true
    }

    /// Stop animation. With `restart_allowed = false` the stop is permanent.
    pub fn stop(&mut self, restart_allowed: bool) {
        if !self.allow_restart {
            return;
        }
        self.allow_restart = restart_allowed;
        self.running = false;
        for plugin in &mut self.plugins {
            plugin.stop();
        }
        info!("Environment stopped (restart allowed: {})", restart_allowed);
    }

    /// Pause: a stop that allows restarting.
    pub fn pause(&mut self) {
        self.stop(true);
    }

    async fn start_plugins(&mut self, from: usize) {
        for plugin in &mut self.plugins[from..] {
            if let Err(e) = plugin.start().await {
                error!("Plugin {} failed to start: {}", plugin.name(), e);
            }
        }
    }

    // =========================================================================
    // Frame loop
    // =========================================================================

    /// Process one real animation frame of `raw_delta_ms` milliseconds.
    pub fn advance(&mut self, raw_delta_ms: f64) -> FrameReport {
        let mut report = FrameReport::default();
        if !self.running {
            return report;
        }

        self.focus.poll_blurs(&mut self.managers, self.presenting);

        let Some(plan) = self.scheduler.plan(raw_delta_ms) else {
            return report;
        };
        report.plan = Some(plan);
        self.frames += 1;

        self.plugin_ctx.control = self.control;
        for plugin in &mut self.plugins {
            plugin.pre_update(&self.plugin_ctx, plan.dt);
        }

        for index in 0..plan.substeps {
            self.scheduler.consume_substep();
            self.run_substep(plan.dt, index == 0);
            report.observer_faults += self.bus.emit(RuntimeEvent::Update);
            report.substeps += 1;
        }
        self.substeps += report.substeps as u64;

        self.plugin_ctx.control = self.control;
        for plugin in &mut self.plugins {
            plugin.post_update(&self.plugin_ctx, plan.dt);
        }

        self.hooks.render();
        report
    }

    fn run_substep(&mut self, dt: f64, first: bool) {
        self.managers.update_all(dt);

        self.control = self.aggregator.fuse(&self.managers, self.stage.pointer_yaw());
        self.stage.integrate(&self.control, dt);
        self.stage.update_pointers();

        if first {
            self.hooks.resolve_picking();
            self.hooks.follow_ui(dt);
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Route a pointer event through focus arbitration, then publish it.
    ///
    /// Command events (escape) only affect focus and are not published.
    pub fn consume_event(&mut self, event: PointerEvent) -> FocusChange {
        let change = self.focus.route(&event, &mut self.managers, self.presenting);
        if event.command.is_none() {
            self.bus.emit(RuntimeEvent::Pointer(event.kind));
        }
        change
    }

    /// Zero every manager and the mouse wedge offset, unless movement is
    /// locked by the focused target. Returns whether anything was zeroed.
    pub fn zero(&mut self) -> bool {
        if self.lock_movement() {
            return false;
        }
        self.managers.zero_all();
        self.aggregator.reset();
        self.bus.emit(RuntimeEvent::Zero);
        true
    }
}

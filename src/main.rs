//! Presence Runtime
//!
//! Demo host: registers keyboard and mouse managers on a planar stage,
//! installs a few sample plugins and animates for a couple of seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use presence::{
    runtime::{self, PlanarStage},
    input::registry::{KEYBOARD, MOUSE},
    plugin::{BoxedPlugin, Plugin, PluginContext, PluginError},
    Axis, AxisInput, Environment, RuntimeConfig, RuntimeEvent, VERSION,
};

/// Frames to animate before exiting.
const DEMO_FRAMES: u64 = 120;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::from_env()?,
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Presence Runtime v{}", VERSION);
    info!(
        "Frame interval: {} ms, strict plugins: {}",
        config.frame_interval_ms, config.strict_plugins
    );

    demo(config).await
}

/// Demo run.
async fn demo(config: RuntimeConfig) -> anyhow::Result<()> {
    let stage = PlanarStage::new(config.avatar_height);
    let mut env = Environment::new(config, Box::new(stage));

    env.add_input_manager(Box::new(AxisInput::new(KEYBOARD).with_value(Axis::Drive, 1.0)));
    env.add_input_manager(Box::new(AxisInput::new(MOUSE).with_rate(Axis::Heading, 0.25)));

    let updates = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&updates);
    env.subscribe(move |event| {
        match event {
            RuntimeEvent::Update => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            other => info!("Event: {}", other.name()),
        }
        Ok(())
    });

    // spatial-audio is requeued until audio installs.
    let plugins: Vec<BoxedPlugin> = vec![
        Box::new(DemoPlugin::new("spatial-audio").requires("audio")),
        Box::new(DemoPlugin::new("audio").provides("audio")),
        Box::new(DemoPlugin::new("teleport").requires(KEYBOARD).requires(MOUSE)),
        Box::new(DemoPlugin::new("haptics").requires("Gamepad_0")),
    ];

    let summary = match runtime::run(&mut env, plugins, Some(DEMO_FRAMES)).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run failed: {}", e);
            return Err(e.into());
        }
    };
    env.stop(false);

    info!("=== Run Summary ===");
    info!("Frames: {}, substeps: {}", summary.frames, summary.substeps);
    info!("Update notifications: {}", updates.load(Ordering::Relaxed));
    info!("Substep size: {:.4}s", env.clock().delta_time());
    info!("Final control: {:?}", env.control());
    info!("Install report:\n{}", serde_json::to_string_pretty(&summary.report)?);

    Ok(())
}

/// Plugin that needs and provides plain capability strings.
struct DemoPlugin {
    name: String,
    requires: Vec<String>,
    provides: Option<String>,
    frames: u64,
}

impl DemoPlugin {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requires: Vec::new(),
            provides: None,
            frames: 0,
        }
    }

    fn requires(mut self, capability: &str) -> Self {
        self.requires.push(capability.to_string());
        self
    }

    fn provides(mut self, capability: &str) -> Self {
        self.provides = Some(capability.to_string());
        self
    }
}

impl Plugin for DemoPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements_met(&self, ctx: &PluginContext) -> Vec<String> {
        ctx.missing(self.requires.iter().map(String::as_str))
    }

    fn install<'a>(
        &'a mut self,
        ctx: &'a mut PluginContext,
    ) -> BoxFuture<'a, Result<Vec<BoxedPlugin>, PluginError>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            if let Some(capability) = &self.provides {
                ctx.provide(capability.clone());
            }
            info!("Installed {}", self.name);
            Ok(Vec::new())
        })
    }

    fn post_update(&mut self, _ctx: &PluginContext, _dt: f64) {
        self.frames += 1;
    }

    fn stop(&mut self) {
        info!("{} stopped after {} frames", self.name, self.frames);
    }
}

//! Runtime Configuration
//!
//! Defaults, JSON loading and `PRESENCE_*` environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runtime::scheduler::SchedulerConfig;

/// Runtime configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Frame scheduler tuning.
    pub scheduler: SchedulerConfig,
    /// Refuse to register a keyboard manager.
    pub disable_keyboard: bool,
    /// Fail the run when a plugin is dropped.
    pub strict_plugins: bool,
    /// Driver frame interval (milliseconds).
    pub frame_interval_ms: u64,
    /// Whether a VR display is presenting at startup.
    pub vr_presenting: bool,
    /// Viewer height above the ground (meters).
    pub avatar_height: f64,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            disable_keyboard: false,
            strict_plugins: false,
            frame_interval_ms: 16,
            vr_presenting: false,
            avatar_height: 1.75,
            log_filter: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `PRESENCE_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |v: String| v == "true" || v == "1";

        if let Some(v) = lookup("PRESENCE_DISABLE_KEYBOARD") {
            self.disable_keyboard = flag(v);
        }
        if let Some(v) = lookup("PRESENCE_STRICT_PLUGINS") {
            self.strict_plugins = flag(v);
        }
        if let Some(v) = lookup("PRESENCE_VR_PRESENTING") {
            self.vr_presenting = flag(v);
        }
        if let Some(v) = lookup("PRESENCE_FRAME_INTERVAL_MS") {
            self.frame_interval_ms = parse("PRESENCE_FRAME_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("PRESENCE_AVATAR_HEIGHT") {
            self.avatar_height = parse("PRESENCE_AVATAR_HEIGHT", &v)?;
        }
        if let Some(v) = lookup("PRESENCE_MAX_FRAME_SECONDS") {
            self.scheduler.max_frame_seconds = parse("PRESENCE_MAX_FRAME_SECONDS", &v)?;
        }
        if let Some(v) = lookup("PRESENCE_LOG") {
            self.log_filter = v;
        }

        self.validate()
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        let positive = [
            ("scheduler.initial_delta_time", s.initial_delta_time),
            ("scheduler.max_frame_seconds", s.max_frame_seconds),
            ("scheduler.runaway_substeps", s.runaway_substeps),
            ("scheduler.recalibration_debt", s.recalibration_debt),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", field, value)));
            }
        }
        if !(s.debt_decay >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scheduler.debt_decay must not be negative, got {}",
                s.debt_decay
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// JSON was malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable did not parse.
    #[error("invalid value {value:?} for {key}")]
    Env {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

//! Scene-level tuning, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::GraphicsSetting;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Size tiers for pooled transform buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Smallest capacity (in instances) ever allocated.
    pub default_capacity: usize,
    /// Tier step above `default_capacity`.
    pub growth_step: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_capacity: 256,
            growth_step: 128,
        }
    }
}

/// Bucketed morph animation cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Number of phase buckets instances are spread across.
    pub bucket_count: usize,
    /// Maximum rate of bucket recomputation.
    pub update_rate_hz: f32,
    /// Phase window the buckets are spread over, independent of clip length.
    pub phase_window_secs: f32,
    /// Maximum rate of spin steps.
    pub spin_rate_hz: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            bucket_count: 20,
            update_rate_hz: 20.0,
            phase_window_secs: 3.0,
            spin_rate_hz: 30.0,
        }
    }
}

impl AnimationConfig {
    /// Minimum wall-clock time between bucket recomputations.
    ///
    /// A rate that is not positive never fires (`Duration::MAX`).
    pub fn update_interval(&self) -> Duration {
        interval_for(self.update_rate_hz)
    }

    /// Minimum wall-clock time between spin steps.
    pub fn spin_interval(&self) -> Duration {
        interval_for(self.spin_rate_hz)
    }

    /// Reject bucket counts and rates the scheduler cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_count == 0 || self.bucket_count > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::Invalid(format!(
                "animation.bucket_count must be in 1..=256, got {}",
                self.bucket_count
            )));
        }
        if !(self.update_rate_hz > 0.0) || !(self.spin_rate_hz > 0.0) {
            return Err(ConfigError::Invalid("animation rates must be > 0".into()));
        }
        if !(self.phase_window_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "animation.phase_window_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn interval_for(rate_hz: f32) -> Duration {
    Duration::try_from_secs_f64(1.0 / f64::from(rate_hz)).unwrap_or(Duration::MAX)
}

/// Distance policy used by the frame visibility manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// World units beyond which bounds stop animating.
    pub animation_max_distance: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            animation_max_distance: 140.0,
        }
    }
}

/// Everything a scene needs to set up pools, groups and visibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub pool: PoolConfig,
    pub animation: AnimationConfig,
    pub visibility: VisibilityConfig,
    pub graphics: GraphicsSetting,
}

impl SceneConfig {
    /// Reject values that would break pool tiering or animation scheduling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.default_capacity == 0 {
            return Err(ConfigError::Invalid("pool.default_capacity must be > 0".into()));
        }
        if self.pool.growth_step == 0 {
            return Err(ConfigError::Invalid("pool.growth_step must be > 0".into()));
        }
        self.animation.validate()?;
        if self.visibility.animation_max_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "visibility.animation_max_distance must be >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Load and validate a config from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

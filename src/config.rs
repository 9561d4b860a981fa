// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Read from `$XDG_CONFIG_HOME/kinect-colordepth/config.json` (or an explicit
//! path). Every field has a default, so a partial file is valid. The file is
//! never written back.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::backends::sensor::types::{ColorImageFormat, DepthImageFormat, SensorStatus};
use crate::constants::{APP_ID, CONFIG_FILE_NAME, DEFAULT_FRAME_QUEUE_DEPTH};
use crate::errors::{AppError, AppResult};
use crate::pipeline::visualization::DepthRenderMode;

/// Settings for the bundled simulated sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Number of simulated devices reported by discovery
    pub device_count: usize,
    /// Status of each device by index; devices past the end are connected
    pub device_status: Vec<SensorStatus>,
    /// Refuse to start, as if another process held the device
    pub device_busy: bool,
    /// Omit the color frame of every n-th pair
    pub drop_color_every: Option<u32>,
    /// Omit the depth frame of every n-th pair
    pub drop_depth_every: Option<u32>,
    /// Emit pairs at this rate instead of the stream preset's
    pub frame_rate_override: Option<u32>,
    /// Move the sphere between frames
    pub animate: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device_count: 1,
            device_status: Vec::new(),
            device_busy: false,
            drop_color_every: None,
            drop_depth_every: None,
            frame_rate_override: None,
            animate: true,
        }
    }
}

impl SimulatorConfig {
    /// Status discovery reports for the device at `index`
    pub fn status_of(&self, index: usize) -> SensorStatus {
        self.device_status
            .get(index)
            .copied()
            .unwrap_or(SensorStatus::Connected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Color stream preset
    pub color_format: ColorImageFormat,
    /// Depth stream preset
    pub depth_format: DepthImageFormat,
    /// Blank color pixels without known depth from the first frame on
    pub mask_invalid_on_start: bool,
    /// How the depth view is rendered
    pub depth_render_mode: DepthRenderMode,
    /// Capacity of the sensor-to-pipeline frame queue
    pub frame_queue_depth: usize,
    pub simulator: SimulatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color_format: ColorImageFormat::RgbResolution640x480Fps30,
            depth_format: DepthImageFormat::Resolution320x240Fps30,
            mask_invalid_on_start: true,
            depth_render_mode: DepthRenderMode::default(),
            frame_queue_depth: DEFAULT_FRAME_QUEUE_DEPTH,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE_NAME))
    }

    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => {
                    debug!("No configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn load_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from JSON text
    pub fn from_json(text: &str) -> AppResult<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.frame_queue_depth == 0 {
            return Err(AppError::Config(
                "frame_queue_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

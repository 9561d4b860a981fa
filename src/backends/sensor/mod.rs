// SPDX-License-Identifier: GPL-3.0-only

//! Depth sensor abstraction
//!
//! The alignment core never talks to a driver directly. It is handed an
//! already-resolved sensor implementing [`DepthSensor`], and the sensor's
//! [`CoordinateMapper`] owns the calibration-dependent mapping math.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Terminal viewer    │  ← ViewportAdapter
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │       Session       │  ← bounded channel, single consumer
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  DepthSensor Trait  │  ← streams + CoordinateMapper
//! └──────────┬──────────┘
//!            │
//!            ▼
//!     ┌──────────────┐
//!     │SimulatedKinect│
//!     └──────────────┘
//! ```

pub mod discovery;
pub mod simulated;
pub mod types;

pub use discovery::{enumerate_sensors, open_first_connected};
pub use simulated::SimulatedKinect;
pub use types::*;

use crate::errors::SensorResult;
use std::sync::Arc;

/// Calibration-dependent translation between color and depth image spaces
///
/// Implementations write into caller-owned tables so the pipeline can reuse
/// its buffers every tick.
pub trait CoordinateMapper: Send + Sync {
    /// Map every color pixel into depth space
    ///
    /// `out` has one entry per color pixel. Entries without a depth reading
    /// must be set to [`DepthImagePoint::UNKNOWN`].
    fn map_color_frame_to_depth_frame(
        &self,
        color_format: ColorImageFormat,
        depth_format: DepthImageFormat,
        depth_pixels: &[DepthImagePixel],
        out: &mut [DepthImagePoint],
    ) -> SensorResult<()>;

    /// Map every depth pixel into color space
    ///
    /// `out` has one entry per depth pixel. Pixels that cannot be mapped
    /// must be set to [`ColorImagePoint::INVALID`].
    fn map_depth_frame_to_color_frame(
        &self,
        depth_format: DepthImageFormat,
        depth_pixels: &[DepthImagePixel],
        color_format: ColorImageFormat,
        out: &mut [ColorImagePoint],
    ) -> SensorResult<()>;
}

/// A sensor that delivers paired color and depth frames
pub trait DepthSensor: Send {
    // ===== Metadata =====

    /// Human readable device name
    fn name(&self) -> &str;

    /// Connection status as seen by discovery
    fn status(&self) -> SensorStatus;

    /// Color presets this device can stream
    fn supported_color_formats(&self) -> &[ColorImageFormat];

    /// Depth presets this device can stream
    fn supported_depth_formats(&self) -> &[DepthImageFormat];

    // ===== Configuration =====

    /// Enable the color stream with a preset
    ///
    /// # Returns
    /// * `Err(SensorError::UnsupportedFormat)` - the preset is not offered
    fn enable_color_stream(&mut self, format: ColorImageFormat) -> SensorResult<()>;

    /// Enable the depth stream with a preset
    fn enable_depth_stream(&mut self, format: DepthImageFormat) -> SensorResult<()>;

    // ===== Lifecycle =====

    /// Start streaming frame pairs into `frames`
    ///
    /// Pairs are delivered sequentially, one per tick. A pair may omit one
    /// side when that stream's frame was dropped.
    ///
    /// # Returns
    /// * `Err(SensorError::DeviceBusy)` - the device cannot be claimed
    /// * `Err(SensorError::StreamNotEnabled)` - a stream was never enabled
    fn start(&mut self, frames: FrameSender) -> SensorResult<()>;

    /// Stop emitting ticks; blocks until the producer has exited
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    // ===== Mapping =====

    /// The device's coordinate mapping capability
    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper>;
}

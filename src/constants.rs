// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Depth range, visualization and sensor constants live here so the
//! pipeline, the simulated sensor and the viewer agree on them.

use std::time::Duration;

/// Application identifier, used for the configuration directory
pub const APP_ID: &str = "kinect-colordepth";

/// Configuration file name inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Bytes per pixel of the BGR32 bitmaps handed to the viewport
pub const BYTES_PER_PIXEL: usize = 4;

/// Depth value reported for pixels without a reading
pub const DEPTH_UNKNOWN_MM: i16 = 0;

/// Reliable depth range of the Kinect V1 in default range mode (millimeters)
pub const DEPTH_MIN_MM: f32 = 800.0;
pub const DEPTH_MAX_MM: f32 = 4000.0;

/// Nearest depth the simulated scene produces
pub const DEPTH_MIN_MM_I16: i16 = 800;

/// Number of quantization bands for depth colormap visualization
pub const DEPTH_COLORMAP_BANDS: f32 = 32.0;

/// Millimeters per meter, for pick readouts
pub const MM_PER_METER: f64 = 1000.0;

/// Default capacity of the frame-pair channel between sensor and pipeline
pub const DEFAULT_FRAME_QUEUE_DEPTH: usize = 2;

/// Glyph drawn at a picked point
pub const MARKER_GLYPH: char = '●';

/// Marker color (orange), RGB
pub const MARKER_COLOR: (u8, u8, u8) = (255, 165, 0);

/// How long the terminal viewer waits for input before redrawing
pub const TERMINAL_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Default number of ticks processed by `probe`
pub const DEFAULT_PROBE_TICKS: u64 = 90;

/// Kinect V1 intrinsics and geometry
///
/// Reference resolution: 640x480. Values for other stream resolutions are
/// obtained by scaling with `width / BASE_WIDTH`.
pub mod kinect {
    /// Focal length X (pixels) at 640x480 base resolution
    pub const FX: f32 = 594.21;
    /// Focal length Y (pixels) at 640x480 base resolution
    pub const FY: f32 = 591.04;
    /// Principal point X (pixels) at 640x480 base resolution
    pub const CX: f32 = 339.5;
    /// Principal point Y (pixels) at 640x480 base resolution
    pub const CY: f32 = 242.7;

    /// Horizontal offset between the IR (depth) and RGB cameras (millimeters)
    pub const COLOR_BASELINE_MM: f32 = 25.0;

    /// Base width for intrinsics calculation
    pub const BASE_WIDTH: f32 = 640.0;
    /// Base height for intrinsics calculation
    pub const BASE_HEIGHT: f32 = 480.0;
}

// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for sensor collaborators
//!
//! Frame formats and per-pixel records follow the Kinect V1 SDK layout so a
//! real driver binding can hand its buffers over without reshaping them.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::mpsc::{Receiver, SyncSender};

use crate::constants::{BYTES_PER_PIXEL, DEPTH_UNKNOWN_MM};

/// Color stream presets offered by a Kinect V1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColorImageFormat {
    /// BGR32 640x480 @ 30fps
    #[default]
    RgbResolution640x480Fps30,
    /// BGR32 1280x960 @ 12fps
    RgbResolution1280x960Fps12,
    /// ISP-processed YUV delivered as BGR32, 640x480 @ 15fps
    YuvResolution640x480Fps15,
    /// Packed UYVY 640x480 @ 15fps
    RawYuvResolution640x480Fps15,
    /// 16-bit IR 640x480 @ 30fps
    InfraredResolution640x480Fps30,
    /// 8-bit Bayer 640x480 @ 30fps
    RawBayerResolution640x480Fps30,
    /// 8-bit Bayer 1280x960 @ 12fps
    RawBayerResolution1280x960Fps12,
    /// No format selected
    Undefined,
}

impl ColorImageFormat {
    /// Every preset, for listing and parsing
    pub const ALL: [ColorImageFormat; 8] = [
        ColorImageFormat::RgbResolution640x480Fps30,
        ColorImageFormat::RgbResolution1280x960Fps12,
        ColorImageFormat::YuvResolution640x480Fps15,
        ColorImageFormat::RawYuvResolution640x480Fps15,
        ColorImageFormat::InfraredResolution640x480Fps30,
        ColorImageFormat::RawBayerResolution640x480Fps30,
        ColorImageFormat::RawBayerResolution1280x960Fps12,
        ColorImageFormat::Undefined,
    ];

    pub fn width(&self) -> u32 {
        match self {
            Self::RgbResolution1280x960Fps12 | Self::RawBayerResolution1280x960Fps12 => 1280,
            Self::Undefined => 0,
            _ => 640,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::RgbResolution1280x960Fps12 | Self::RawBayerResolution1280x960Fps12 => 960,
            Self::Undefined => 0,
            _ => 480,
        }
    }

    pub fn fps(&self) -> u32 {
        match self {
            Self::RgbResolution640x480Fps30
            | Self::InfraredResolution640x480Fps30
            | Self::RawBayerResolution640x480Fps30 => 30,
            Self::YuvResolution640x480Fps15 | Self::RawYuvResolution640x480Fps15 => 15,
            Self::RgbResolution1280x960Fps12 | Self::RawBayerResolution1280x960Fps12 => 12,
            Self::Undefined => 0,
        }
    }

    /// Bytes per pixel of the delivered buffer
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::RgbResolution640x480Fps30
            | Self::RgbResolution1280x960Fps12
            | Self::YuvResolution640x480Fps15 => BYTES_PER_PIXEL,
            Self::RawYuvResolution640x480Fps15 | Self::InfraredResolution640x480Fps30 => 2,
            Self::RawBayerResolution640x480Fps30 | Self::RawBayerResolution1280x960Fps12 => 1,
            Self::Undefined => 0,
        }
    }

    /// True for the presets delivered as 4-byte BGR32 pixels
    pub fn is_bgr32(&self) -> bool {
        self.bytes_per_pixel() == BYTES_PER_PIXEL
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Length of one frame in bytes
    pub fn frame_pixel_data_length(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RgbResolution640x480Fps30 => "RgbResolution640x480Fps30",
            Self::RgbResolution1280x960Fps12 => "RgbResolution1280x960Fps12",
            Self::YuvResolution640x480Fps15 => "YuvResolution640x480Fps15",
            Self::RawYuvResolution640x480Fps15 => "RawYuvResolution640x480Fps15",
            Self::InfraredResolution640x480Fps30 => "InfraredResolution640x480Fps30",
            Self::RawBayerResolution640x480Fps30 => "RawBayerResolution640x480Fps30",
            Self::RawBayerResolution1280x960Fps12 => "RawBayerResolution1280x960Fps12",
            Self::Undefined => "Undefined",
        }
    }
}

impl std::fmt::Display for ColorImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::Undefined {
            return write!(f, "undefined");
        }
        write!(
            f,
            "{} ({}x{} @ {}fps)",
            self.name(),
            self.width(),
            self.height(),
            self.fps()
        )
    }
}

impl FromStr for ColorImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown color format: {}", s))
    }
}

/// Depth stream presets offered by a Kinect V1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DepthImageFormat {
    Resolution640x480Fps30,
    #[default]
    Resolution320x240Fps30,
    Resolution80x60Fps30,
    /// No format selected
    Undefined,
}

impl DepthImageFormat {
    /// Every preset, for listing and parsing
    pub const ALL: [DepthImageFormat; 4] = [
        DepthImageFormat::Resolution640x480Fps30,
        DepthImageFormat::Resolution320x240Fps30,
        DepthImageFormat::Resolution80x60Fps30,
        DepthImageFormat::Undefined,
    ];

    pub fn width(&self) -> u32 {
        match self {
            Self::Resolution640x480Fps30 => 640,
            Self::Resolution320x240Fps30 => 320,
            Self::Resolution80x60Fps30 => 80,
            Self::Undefined => 0,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Resolution640x480Fps30 => 480,
            Self::Resolution320x240Fps30 => 240,
            Self::Resolution80x60Fps30 => 60,
            Self::Undefined => 0,
        }
    }

    pub fn fps(&self) -> u32 {
        match self {
            Self::Undefined => 0,
            _ => 30,
        }
    }

    /// Number of depth samples per frame
    pub fn frame_pixel_data_length(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolution640x480Fps30 => "Resolution640x480Fps30",
            Self::Resolution320x240Fps30 => "Resolution320x240Fps30",
            Self::Resolution80x60Fps30 => "Resolution80x60Fps30",
            Self::Undefined => "Undefined",
        }
    }
}

impl std::fmt::Display for DepthImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::Undefined {
            return write!(f, "undefined");
        }
        write!(
            f,
            "{} ({}x{} @ {}fps)",
            self.name(),
            self.width(),
            self.height(),
            self.fps()
        )
    }
}

impl FromStr for DepthImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown depth format: {}", s))
    }
}

/// One depth sample, laid out like the SDK's `DepthImagePixel`
///
/// Four bytes per sample, which is why a depth buffer can be handed to a
/// BGR32 bitmap unchanged.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DepthImagePixel {
    pub player_index: i16,
    /// Depth in millimeters, 0 when unknown
    pub depth: i16,
}

impl DepthImagePixel {
    pub const UNKNOWN: DepthImagePixel = DepthImagePixel {
        player_index: 0,
        depth: DEPTH_UNKNOWN_MM,
    };

    pub fn new(depth_mm: i16) -> Self {
        Self {
            player_index: 0,
            depth: depth_mm,
        }
    }

    pub fn is_known_depth(&self) -> bool {
        self.depth > DEPTH_UNKNOWN_MM
    }
}

/// A color pixel mapped into depth space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthImagePoint {
    pub x: i32,
    pub y: i32,
    /// Depth in millimeters, 0 is the "no known depth" sentinel
    pub depth: i32,
}

impl DepthImagePoint {
    pub const UNKNOWN: DepthImagePoint = DepthImagePoint { x: 0, y: 0, depth: 0 };

    pub fn is_known(&self) -> bool {
        self.depth > 0
    }
}

/// A depth pixel mapped into color space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorImagePoint {
    pub x: i32,
    pub y: i32,
}

impl ColorImagePoint {
    pub const INVALID: ColorImagePoint = ColorImagePoint {
        x: i32::MIN,
        y: i32::MIN,
    };

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for ColorImagePoint {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for ColorImagePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "x: {} y: {}", self.x, self.y)
        } else {
            write!(f, "unmapped")
        }
    }
}

/// One color frame as delivered by the sensor
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub format: ColorImageFormat,
    /// BGR32 pixel bytes
    pub data: Vec<u8>,
    pub frame_number: u64,
}

/// One depth frame as delivered by the sensor
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub format: DepthImageFormat,
    pub pixels: Vec<DepthImagePixel>,
    pub frame_number: u64,
}

/// Color and depth delivered together for one tick
///
/// Either side is `None` when the sensor dropped that stream's frame.
#[derive(Debug, Clone, Default)]
pub struct FramePair {
    pub color: Option<ColorFrame>,
    pub depth: Option<DepthFrame>,
}

impl FramePair {
    /// True when both streams dropped their frame
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none()
    }
}

/// Sending half of the bounded frame-pair channel, handed to `start()`
pub type FrameSender = SyncSender<FramePair>;

/// Receiving half, owned by the single pipeline consumer
pub type FrameReceiver = Receiver<FramePair>;

/// Connection status of a sensor, as reported during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Connected,
    Disconnected,
    NotPowered,
    Initializing,
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorStatus::Connected => write!(f, "connected"),
            SensorStatus::Disconnected => write!(f, "disconnected"),
            SensorStatus::NotPowered => write!(f, "not powered"),
            SensorStatus::Initializing => write!(f, "initializing"),
        }
    }
}

/// Discovery record for a sensor
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub name: String,
    /// Device path, e.g. `sim:0`
    pub path: String,
    pub status: SensorStatus,
    pub color_formats: Vec<ColorImageFormat>,
    pub depth_formats: Vec<DepthImageFormat>,
}

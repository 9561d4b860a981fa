// SPDX-License-Identifier: GPL-3.0-only

//! Simulated Kinect V1
//!
//! Streams a synthetic scene (back wall, floor, a drifting sphere, an IR
//! shadow band and a too-far corner) and maps between the two image spaces
//! with the Kinect V1 pinhole intrinsics. It stands in for the vendor
//! driver so the pipeline, the viewer and the tests run without hardware.

use std::sync::Arc;
use std::sync::mpsc::TrySendError;
use std::time::Duration;

use tracing::{debug, info};

use super::types::*;
use super::{CoordinateMapper, DepthSensor};
use crate::backends::frame_loop::{CaptureLoopController, LoopAction};
use crate::config::SimulatorConfig;
use crate::constants::{DEPTH_MIN_MM_I16, kinect};
use crate::errors::{SensorError, SensorResult};

/// Path prefix for simulated devices
pub const SIMULATED_PATH_PREFIX: &str = "sim:";

/// Color presets the simulator can produce (BGR32 only)
pub const SIMULATED_COLOR_FORMATS: [ColorImageFormat; 2] = [
    ColorImageFormat::RgbResolution640x480Fps30,
    ColorImageFormat::RgbResolution1280x960Fps12,
];

/// Depth presets the simulator can produce
pub const SIMULATED_DEPTH_FORMATS: [DepthImageFormat; 3] = [
    DepthImageFormat::Resolution640x480Fps30,
    DepthImageFormat::Resolution320x240Fps30,
    DepthImageFormat::Resolution80x60Fps30,
];

/// Simulated Kinect V1 sensor
pub struct SimulatedKinect {
    name: String,
    path: String,
    settings: SimulatorConfig,
    status: SensorStatus,
    color_format: Option<ColorImageFormat>,
    depth_format: Option<DepthImageFormat>,
    mapper: Arc<KinectIntrinsicsMapper>,
    capture: Option<CaptureLoopController>,
}

impl SimulatedKinect {
    pub fn new(index: usize, settings: SimulatorConfig) -> Self {
        Self {
            name: format!("Simulated Kinect V1 #{}", index),
            path: format!("{}{}", SIMULATED_PATH_PREFIX, index),
            status: settings.status_of(index),
            settings,
            color_format: None,
            depth_format: None,
            mapper: Arc::new(KinectIntrinsicsMapper),
            capture: None,
        }
    }

    /// Device path, e.g. `sim:0`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Discovery record for this device
    pub fn info(&self) -> SensorInfo {
        SensorInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            status: self.status,
            color_formats: self.supported_color_formats().to_vec(),
            depth_formats: self.supported_depth_formats().to_vec(),
        }
    }

    fn frame_interval(&self, color: ColorImageFormat, depth: DepthImageFormat) -> Duration {
        let fps = self
            .settings
            .frame_rate_override
            .unwrap_or_else(|| color.fps().min(depth.fps()))
            .max(1);
        Duration::from_secs_f64(1.0 / fps as f64)
    }
}

impl DepthSensor for SimulatedKinect {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    fn supported_color_formats(&self) -> &[ColorImageFormat] {
        &SIMULATED_COLOR_FORMATS
    }

    fn supported_depth_formats(&self) -> &[DepthImageFormat] {
        &SIMULATED_DEPTH_FORMATS
    }

    fn enable_color_stream(&mut self, format: ColorImageFormat) -> SensorResult<()> {
        if !SIMULATED_COLOR_FORMATS.contains(&format) {
            return Err(SensorError::UnsupportedFormat(format!(
                "color format {} is not supported by {}",
                format.name(),
                self.name
            )));
        }
        debug!(device = %self.path, format = %format, "Color stream enabled");
        self.color_format = Some(format);
        Ok(())
    }

    fn enable_depth_stream(&mut self, format: DepthImageFormat) -> SensorResult<()> {
        if !SIMULATED_DEPTH_FORMATS.contains(&format) {
            return Err(SensorError::UnsupportedFormat(format!(
                "depth format {} is not supported by {}",
                format.name(),
                self.name
            )));
        }
        debug!(device = %self.path, format = %format, "Depth stream enabled");
        self.depth_format = Some(format);
        Ok(())
    }

    fn start(&mut self, frames: FrameSender) -> SensorResult<()> {
        if self.is_running() {
            return Err(SensorError::AlreadyRunning);
        }
        if self.status != SensorStatus::Connected {
            debug!(device = %self.path, status = %self.status, "Refusing to start");
            return Err(SensorError::NoSensorFound);
        }
        if self.settings.device_busy {
            return Err(SensorError::DeviceBusy(format!(
                "{} is claimed by another process",
                self.path
            )));
        }
        let color_format = self
            .color_format
            .ok_or(SensorError::StreamNotEnabled("Color"))?;
        let depth_format = self
            .depth_format
            .ok_or(SensorError::StreamNotEnabled("Depth"))?;

        let interval = self.frame_interval(color_format, depth_format);
        let settings = self.settings.clone();
        let path = self.path.clone();

        info!(
            device = %self.path,
            color = %color_format,
            depth = %depth_format,
            interval = ?interval,
            "Starting simulated sensor"
        );

        let controller = CaptureLoopController::start_paced(
            &format!("{}-capture", self.path),
            interval,
            move || Ok(SimulatedScene::new(color_format, depth_format, settings)),
            move |scene| {
                let pair = scene.next_pair();
                if pair.is_empty() {
                    return LoopAction::Continue;
                }
                match frames.try_send(pair) {
                    Ok(()) => LoopAction::Continue,
                    Err(TrySendError::Full(pair)) => {
                        let frame = pair
                            .depth
                            .as_ref()
                            .map(|d| d.frame_number)
                            .or(pair.color.as_ref().map(|c| c.frame_number));
                        debug!(device = %path, frame = ?frame, "Frame queue full, dropping pair");
                        LoopAction::Continue
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        debug!(device = %path, "Frame consumer gone, stopping capture");
                        LoopAction::Stop
                    }
                }
            },
        );

        self.capture = Some(controller);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            info!(device = %self.path, "Stopping simulated sensor");
            capture.stop();
        }
    }

    fn is_running(&self) -> bool {
        self.capture
            .as_ref()
            .map(|c| c.is_running())
            .unwrap_or(false)
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        self.mapper.clone()
    }
}

impl Drop for SimulatedKinect {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Scene synthesis
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Wall,
    Floor,
    Sphere,
    /// IR shadow on the left edge, no depth reading
    Shadow,
    /// Beyond sensor range, no depth reading
    TooFar,
}

/// Classify a normalized image position and return its depth in mm
fn scene_at(nx: f32, ny: f32, phase: f32) -> (Region, i16) {
    if nx < 0.04 {
        return (Region::Shadow, 0);
    }
    if nx > 0.8 && ny < 0.2 {
        return (Region::TooFar, 0);
    }

    let cx = 0.5 + 0.2 * phase.sin();
    let cy = 0.5;
    let radius = 0.18;
    // Normalized x spans 4:3, scale so the sphere stays round
    let dx = (nx - cx) * 4.0 / 3.0;
    let dy = ny - cy;
    let d2 = dx * dx + dy * dy;
    if d2 < radius * radius {
        let bulge = (1.0 - d2 / (radius * radius)).sqrt();
        let depth = 1400.0 - 350.0 * bulge;
        return (Region::Sphere, depth as i16);
    }

    if ny > 0.8 {
        // Floor approaches the sensor towards the bottom edge
        let t = (ny - 0.8) / 0.2;
        let depth = 3000.0 - t * 1800.0;
        return (Region::Floor, (depth as i16).max(DEPTH_MIN_MM_I16));
    }

    (Region::Wall, 3000)
}

/// BGR32 color for a scene region at pixel (x, y)
fn color_of(region: Region, x: u32, y: u32, ny: f32) -> [u8; 4] {
    match region {
        Region::Wall | Region::Shadow => {
            let checker = ((x / 32) + (y / 32)) % 2 == 0;
            if checker {
                [200, 215, 225, 255]
            } else {
                [170, 185, 195, 255]
            }
        }
        Region::Floor => {
            let shade = (60.0 + ny * 80.0) as u8;
            [40, shade, 50, 255]
        }
        Region::Sphere => [30, 120, 235, 255],
        Region::TooFar => [235, 200, 150, 255],
    }
}

/// Per-capture-thread scene state
struct SimulatedScene {
    color_format: ColorImageFormat,
    depth_format: DepthImageFormat,
    settings: SimulatorConfig,
    frame_number: u64,
}

impl SimulatedScene {
    fn new(
        color_format: ColorImageFormat,
        depth_format: DepthImageFormat,
        settings: SimulatorConfig,
    ) -> Self {
        Self {
            color_format,
            depth_format,
            settings,
            frame_number: 0,
        }
    }

    fn phase(&self) -> f32 {
        if self.settings.animate {
            self.frame_number as f32 * 0.05
        } else {
            0.0
        }
    }

    fn next_pair(&mut self) -> FramePair {
        self.frame_number += 1;
        let n = self.frame_number;
        let drops = |every: Option<u32>| every.is_some_and(|k| k > 0 && n % k as u64 == 0);

        let color = if drops(self.settings.drop_color_every) {
            debug!(frame = n, "Simulating dropped color frame");
            None
        } else {
            Some(self.render_color())
        };
        let depth = if drops(self.settings.drop_depth_every) {
            debug!(frame = n, "Simulating dropped depth frame");
            None
        } else {
            Some(self.render_depth())
        };

        FramePair { color, depth }
    }

    fn render_color(&self) -> ColorFrame {
        let (w, h) = (self.color_format.width(), self.color_format.height());
        let phase = self.phase();
        let mut data = Vec::with_capacity(self.color_format.frame_pixel_data_length());
        for y in 0..h {
            let ny = y as f32 / h as f32;
            for x in 0..w {
                let nx = x as f32 / w as f32;
                let (region, _) = scene_at(nx, ny, phase);
                data.extend_from_slice(&color_of(region, x, y, ny));
            }
        }
        ColorFrame {
            format: self.color_format,
            data,
            frame_number: self.frame_number,
        }
    }

    fn render_depth(&self) -> DepthFrame {
        let (w, h) = (self.depth_format.width(), self.depth_format.height());
        let phase = self.phase();
        let mut pixels = Vec::with_capacity(self.depth_format.frame_pixel_data_length());
        for y in 0..h {
            let ny = y as f32 / h as f32;
            for x in 0..w {
                let nx = x as f32 / w as f32;
                let (_, depth) = scene_at(nx, ny, phase);
                pixels.push(DepthImagePixel::new(depth));
            }
        }
        DepthFrame {
            format: self.depth_format,
            pixels,
            frame_number: self.frame_number,
        }
    }
}

// =============================================================================
// Coordinate mapping
// =============================================================================

/// Pinhole mapping with the Kinect V1 intrinsics
///
/// Both cameras share the base intrinsics scaled to their stream width; the
/// color camera is offset horizontally by `COLOR_BASELINE_MM`, which gives
/// the depth-dependent parallax that leaves unmapped color pixels along
/// object edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct KinectIntrinsicsMapper;

impl KinectIntrinsicsMapper {
    fn check_formats(
        depth_format: DepthImageFormat,
        color_format: ColorImageFormat,
        depth_len: usize,
    ) -> SensorResult<()> {
        if depth_format == DepthImageFormat::Undefined || color_format == ColorImageFormat::Undefined
        {
            return Err(SensorError::MappingFailed(
                "cannot map with an undefined format".to_string(),
            ));
        }
        if depth_len != depth_format.frame_pixel_data_length() {
            return Err(SensorError::MappingFailed(format!(
                "expected {} depth samples for {}, got {}",
                depth_format.frame_pixel_data_length(),
                depth_format.name(),
                depth_len
            )));
        }
        Ok(())
    }

    /// Top-left color pixel seen by depth pixel (u, v) at `depth_mm`
    fn project(
        u: u32,
        v: u32,
        depth_mm: f32,
        depth_format: DepthImageFormat,
        color_format: ColorImageFormat,
    ) -> (f32, f32) {
        let sd = depth_format.width() as f32 / kinect::BASE_WIDTH;
        let sc = color_format.width() as f32 / kinect::BASE_WIDTH;

        // Unproject on the depth camera's normalized image plane
        let xn = (u as f32 - kinect::CX * sd) / (kinect::FX * sd);
        let yn = (v as f32 - kinect::CY * sd) / (kinect::FY * sd);

        let xc = (xn + kinect::COLOR_BASELINE_MM / depth_mm) * kinect::FX * sc + kinect::CX * sc;
        let yc = yn * kinect::FY * sc + kinect::CY * sc;
        (xc, yc)
    }
}

impl CoordinateMapper for KinectIntrinsicsMapper {
    fn map_color_frame_to_depth_frame(
        &self,
        color_format: ColorImageFormat,
        depth_format: DepthImageFormat,
        depth_pixels: &[DepthImagePixel],
        out: &mut [DepthImagePoint],
    ) -> SensorResult<()> {
        Self::check_formats(depth_format, color_format, depth_pixels.len())?;
        if out.len() != color_format.pixel_count() {
            return Err(SensorError::MappingFailed(format!(
                "color-to-depth table has {} entries, expected {}",
                out.len(),
                color_format.pixel_count()
            )));
        }

        out.fill(DepthImagePoint::UNKNOWN);

        let (dw, cw, ch) = (
            depth_format.width(),
            color_format.width() as i64,
            color_format.height() as i64,
        );
        // Footprint of one depth pixel in color pixels
        let block = (color_format.width() / depth_format.width()).max(1) as i64;

        for (i, pixel) in depth_pixels.iter().enumerate() {
            if !pixel.is_known_depth() {
                continue;
            }
            let u = i as u32 % dw;
            let v = i as u32 / dw;
            let depth = pixel.depth as i32;
            let (xc, yc) = Self::project(u, v, depth as f32, depth_format, color_format);
            let (x0, y0) = (xc.floor() as i64, yc.floor() as i64);

            for y in y0.max(0)..(y0 + block).min(ch) {
                for x in x0.max(0)..(x0 + block).min(cw) {
                    let slot = &mut out[(y * cw + x) as usize];
                    // Nearest surface wins where footprints overlap
                    if !slot.is_known() || slot.depth > depth {
                        *slot = DepthImagePoint {
                            x: u as i32,
                            y: v as i32,
                            depth,
                        };
                    }
                }
            }
        }
        Ok(())
    }

    fn map_depth_frame_to_color_frame(
        &self,
        depth_format: DepthImageFormat,
        depth_pixels: &[DepthImagePixel],
        color_format: ColorImageFormat,
        out: &mut [ColorImagePoint],
    ) -> SensorResult<()> {
        Self::check_formats(depth_format, color_format, depth_pixels.len())?;
        if out.len() != depth_pixels.len() {
            return Err(SensorError::MappingFailed(format!(
                "depth-to-color table has {} entries, expected {}",
                out.len(),
                depth_pixels.len()
            )));
        }

        let dw = depth_format.width();
        let (cw, ch) = (color_format.width() as f32, color_format.height() as f32);

        for (i, (pixel, slot)) in depth_pixels.iter().zip(out.iter_mut()).enumerate() {
            if !pixel.is_known_depth() {
                *slot = ColorImagePoint::INVALID;
                continue;
            }
            let u = i as u32 % dw;
            let v = i as u32 / dw;
            let (xc, yc) = Self::project(u, v, pixel.depth as f32, depth_format, color_format);
            *slot = if xc >= 0.0 && yc >= 0.0 && xc < cw && yc < ch {
                ColorImagePoint {
                    x: xc as i32,
                    y: yc as i32,
                }
            } else {
                ColorImagePoint::INVALID
            };
        }
        Ok(())
    }
}

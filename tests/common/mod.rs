// SPDX-License-Identifier: GPL-3.0-only

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use kinect_colordepth::backends::sensor::{
    ColorFrame, ColorImageFormat, ColorImagePoint, CoordinateMapper, DepthFrame,
    DepthImageFormat, DepthImagePixel, DepthImagePoint, DepthSensor, FramePair, FrameSender,
    SensorStatus,
};
use kinect_colordepth::errors::{SensorError, SensorResult};
use kinect_colordepth::pipeline::{Bitmap, TickOutcome};
use kinect_colordepth::session::ViewportAdapter;

pub const COLOR: ColorImageFormat = ColorImageFormat::RgbResolution640x480Fps30;
pub const DEPTH: DepthImageFormat = DepthImageFormat::Resolution320x240Fps30;

/// Maps color pixel (x, y) to depth pixel (x / s, y / s) and back, where
/// `s` is the width ratio between the two streams
pub struct ScaleMapper;

impl ScaleMapper {
    fn scale(color: ColorImageFormat, depth: DepthImageFormat) -> u32 {
        (color.width() / depth.width()).max(1)
    }
}

impl CoordinateMapper for ScaleMapper {
    fn map_color_frame_to_depth_frame(
        &self,
        color_format: ColorImageFormat,
        depth_format: DepthImageFormat,
        depth_pixels: &[DepthImagePixel],
        out: &mut [DepthImagePoint],
    ) -> SensorResult<()> {
        let s = Self::scale(color_format, depth_format);
        let (cw, dw) = (color_format.width(), depth_format.width());
        for (i, slot) in out.iter_mut().enumerate() {
            let (x, y) = (i as u32 % cw / s, i as u32 / cw / s);
            let sample = depth_pixels[(y * dw + x) as usize];
            *slot = if sample.is_known_depth() {
                DepthImagePoint {
                    x: x as i32,
                    y: y as i32,
                    depth: sample.depth as i32,
                }
            } else {
                DepthImagePoint::UNKNOWN
            };
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
        let s = Self::scale(color_format, depth_format);
        let dw = depth_format.width();
        for (i, (sample, slot)) in depth_pixels.iter().zip(out.iter_mut()).enumerate() {
            *slot = if sample.is_known_depth() {
                ColorImagePoint {
                    x: (i as u32 % dw * s) as i32,
                    y: (i as u32 / dw * s) as i32,
                }
            } else {
                ColorImagePoint::INVALID
            };
        }
        Ok(())
    }
}

/// Handle the test uses to push frame pairs into a started sensor
#[derive(Clone, Default)]
pub struct Feed(Arc<Mutex<Option<FrameSender>>>);

impl Feed {
    pub fn send(&self, pair: FramePair) {
        let guard = self.0.lock().unwrap();
        guard
            .as_ref()
            .expect("sensor not started")
            .try_send(pair)
            .expect("frame queue full");
    }

    pub fn disconnect(&self) {
        self.0.lock().unwrap().take();
    }
}

/// Sensor whose frames come from the test through a [`Feed`]
pub struct ScriptedSensor {
    feed: Feed,
    busy: bool,
    color_format: Option<ColorImageFormat>,
    depth_format: Option<DepthImageFormat>,
    running: bool,
}

impl ScriptedSensor {
    pub fn new() -> (Self, Feed) {
        let feed = Feed::default();
        let sensor = Self {
            feed: feed.clone(),
            busy: false,
            color_format: None,
            depth_format: None,
            running: false,
        };
        (sensor, feed)
    }

    pub fn busy() -> Self {
        let (mut sensor, _) = Self::new();
        sensor.busy = true;
        sensor
    }
}

const SUPPORTED_COLOR: [ColorImageFormat; 1] = [COLOR];
const SUPPORTED_DEPTH: [DepthImageFormat; 1] = [DEPTH];

impl DepthSensor for ScriptedSensor {
    fn name(&self) -> &str {
        "Scripted sensor"
    }

    fn status(&self) -> SensorStatus {
        SensorStatus::Connected
    }

    fn supported_color_formats(&self) -> &[ColorImageFormat] {
        &SUPPORTED_COLOR
    }

    fn supported_depth_formats(&self) -> &[DepthImageFormat] {
        &SUPPORTED_DEPTH
    }

    fn enable_color_stream(&mut self, format: ColorImageFormat) -> SensorResult<()> {
        if format != COLOR {
            return Err(SensorError::UnsupportedFormat(format.name().to_string()));
        }
        self.color_format = Some(format);
        Ok(())
    }

    fn enable_depth_stream(&mut self, format: DepthImageFormat) -> SensorResult<()> {
        if format != DEPTH {
            return Err(SensorError::UnsupportedFormat(format.name().to_string()));
        }
        self.depth_format = Some(format);
        Ok(())
    }

    fn start(&mut self, frames: FrameSender) -> SensorResult<()> {
        if self.busy {
            return Err(SensorError::DeviceBusy("scripted".to_string()));
        }
        *self.feed.0.lock().unwrap() = Some(frames);
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.feed.disconnect();
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        Arc::new(ScaleMapper)
    }
}

/// Sensor whose capture thread blocks on a full queue and refills it the
/// moment a slot frees up
#[derive(Default)]
pub struct FloodSensor {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DepthSensor for FloodSensor {
    fn name(&self) -> &str {
        "Flooding sensor"
    }

    fn status(&self) -> SensorStatus {
        SensorStatus::Connected
    }

    fn supported_color_formats(&self) -> &[ColorImageFormat] {
        &SUPPORTED_COLOR
    }

    fn supported_depth_formats(&self) -> &[DepthImageFormat] {
        &SUPPORTED_DEPTH
    }

    fn enable_color_stream(&mut self, _format: ColorImageFormat) -> SensorResult<()> {
        Ok(())
    }

    fn enable_depth_stream(&mut self, _format: DepthImageFormat) -> SensorResult<()> {
        Ok(())
    }

    fn start(&mut self, frames: FrameSender) -> SensorResult<()> {
        let stop = Arc::clone(&self.stop);
        let template = pair(Some(color_frame(7)), Some(depth_frame(1200)));
        self.thread = Some(std::thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                if frames.send(template.clone()).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    // Does not join: the thread may be blocked in `send` until the
    // receiver is dropped
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.thread.take();
    }

    fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        Arc::new(ScaleMapper)
    }
}

/// Viewport that remembers what it was shown
#[derive(Default)]
pub struct RecordingViewport {
    pub color_lengths: Vec<usize>,
    pub depth_lengths: Vec<usize>,
    pub outcomes: Vec<TickOutcome>,
}

impl ViewportAdapter for RecordingViewport {
    fn present(&mut self, color: Bitmap<'_>, depth: Bitmap<'_>, outcome: &TickOutcome) {
        self.color_lengths.push(color.data.len());
        self.depth_lengths.push(depth.data.len());
        self.outcomes.push(*outcome);
    }
}

pub fn color_frame(value: u8) -> ColorFrame {
    ColorFrame {
        format: COLOR,
        data: vec![value; COLOR.frame_pixel_data_length()],
        frame_number: 0,
    }
}

/// Depth frame with `depth_mm` everywhere except the left half of row 0,
/// which has no reading
pub fn depth_frame(depth_mm: i16) -> DepthFrame {
    let mut pixels = vec![DepthImagePixel::new(depth_mm); DEPTH.frame_pixel_data_length()];
    for pixel in pixels.iter_mut().take(DEPTH.width() as usize / 2) {
        *pixel = DepthImagePixel::UNKNOWN;
    }
    DepthFrame {
        format: DEPTH,
        pixels,
        frame_number: 0,
    }
}

pub fn pair(color: Option<ColorFrame>, depth: Option<DepthFrame>) -> FramePair {
    FramePair { color, depth }
}

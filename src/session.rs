// SPDX-License-Identifier: GPL-3.0-only

//! Session: the UI-facing surface of the alignment core
//!
//! A session owns the injected sensor, the bounded frame channel, the
//! alignment pipeline, the mask state and the marker board. Frame pairs are
//! processed only by [`Session::pump`], so ticks never overlap and the frame
//! buffers need no lock.

use std::sync::mpsc::{self, TryRecvError};

use tracing::{debug, info, warn};

use crate::backends::sensor::DepthSensor;
use crate::backends::sensor::types::FrameReceiver;
use crate::config::Config;
use crate::errors::{AppError, AppResult, PickError, SensorError};
use crate::pipeline::{
    AlignmentPipeline, Bitmap, DepthRenderMode, MaskMode, MaskToggle, Marker, MarkerBoard,
    PickResult, SharedMarkerBoard, TickOutcome, View,
};

/// Receives the images after every tick
pub trait ViewportAdapter {
    fn present(&mut self, color: Bitmap<'_>, depth: Bitmap<'_>, outcome: &TickOutcome);
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built but not started
    Idle,
    /// No sensor was found or it could not be claimed
    NoSensor,
    Streaming,
    /// Shut down, or the sensor stopped delivering
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::NoSensor => write!(f, "no sensor"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

pub struct Session {
    sensor: Option<Box<dyn DepthSensor>>,
    config: Config,
    state: SessionState,
    pipeline: Option<AlignmentPipeline>,
    frames: Option<FrameReceiver>,
    mask: MaskToggle,
    render_mode: DepthRenderMode,
    markers: SharedMarkerBoard,
}

impl Session {
    /// Build a session around an already resolved sensor
    ///
    /// `None` means no sensor is available; the session then starts into
    /// [`SessionState::NoSensor`].
    pub fn new(sensor: Option<Box<dyn DepthSensor>>, config: Config) -> Self {
        let mask = MaskToggle::new(config.mask_invalid_on_start);
        let render_mode = config.depth_render_mode;
        Self {
            sensor,
            config,
            state: SessionState::Idle,
            pipeline: None,
            frames: None,
            mask,
            render_mode,
            markers: MarkerBoard::shared(),
        }
    }

    /// Enable the configured streams and start the sensor
    ///
    /// An unsupported stream format is a configuration error. A device that
    /// cannot be claimed leaves the session in [`SessionState::NoSensor`]
    /// and still returns `Ok`.
    pub fn start(&mut self) -> AppResult<SessionState> {
        match self.state {
            SessionState::Idle => {}
            SessionState::NoSensor => return Ok(self.state),
            SessionState::Streaming => return Err(SensorError::AlreadyRunning.into()),
            SessionState::Stopped => {
                return Err(AppError::Other("session has been shut down".to_string()));
            }
        }

        let Some(sensor) = self.sensor.as_mut() else {
            info!("No sensor available, session is idle");
            self.state = SessionState::NoSensor;
            return Ok(self.state);
        };

        let color_format = self.config.color_format;
        let depth_format = self.config.depth_format;
        if !sensor.supported_color_formats().contains(&color_format) {
            return Err(AppError::Config(format!(
                "{} does not offer color format {} (supported: {})",
                sensor.name(),
                color_format.name(),
                format_names(sensor.supported_color_formats().iter().map(|f| f.name()))
            )));
        }
        if !sensor.supported_depth_formats().contains(&depth_format) {
            return Err(AppError::Config(format!(
                "{} does not offer depth format {} (supported: {})",
                sensor.name(),
                depth_format.name(),
                format_names(sensor.supported_depth_formats().iter().map(|f| f.name()))
            )));
        }
        sensor.enable_color_stream(color_format)?;
        sensor.enable_depth_stream(depth_format)?;

        let pipeline = AlignmentPipeline::new(
            sensor.coordinate_mapper(),
            color_format,
            depth_format,
            self.render_mode,
        );
        let (sender, receiver) = mpsc::sync_channel(self.config.frame_queue_depth.max(1));

        match sensor.start(sender) {
            Ok(()) => {}
            Err(e) if e.is_unavailable() => {
                warn!(sensor = %sensor.name(), error = %e, "Sensor unavailable, session is idle");
                self.state = SessionState::NoSensor;
                return Ok(self.state);
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            sensor = %sensor.name(),
            color = %color_format,
            depth = %depth_format,
            "Session streaming"
        );
        self.pipeline = Some(pipeline);
        self.frames = Some(receiver);
        self.state = SessionState::Streaming;
        Ok(self.state)
    }

    /// Process pending frame pairs and notify `viewport` after each
    ///
    /// At most `frame_queue_depth` pairs are handled per call, so a producer
    /// that keeps the queue full cannot hold the caller here. Returns the
    /// number of ticks processed.
    pub fn pump(&mut self, viewport: &mut dyn ViewportAdapter) -> usize {
        let (Some(frames), Some(pipeline)) = (self.frames.as_ref(), self.pipeline.as_mut()) else {
            return 0;
        };

        let budget = self.config.frame_queue_depth.max(1);
        let mut processed = 0;
        let mut disconnected = false;
        while processed < budget {
            match frames.try_recv() {
                Ok(pair) => {
                    let outcome = pipeline.process_tick(pair, self.mask.is_enabled());
                    viewport.present(
                        pipeline.masked_color_image(),
                        pipeline.depth_visualization_image(),
                        &outcome,
                    );
                    processed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if disconnected {
            warn!("Sensor stopped delivering frames");
            self.frames = None;
            self.state = SessionState::Stopped;
        }
        processed
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn masked_color_image(&self) -> Option<Bitmap<'_>> {
        self.pipeline.as_ref().map(|p| p.masked_color_image())
    }

    pub fn depth_visualization_image(&self) -> Option<Bitmap<'_>> {
        self.pipeline.as_ref().map(|p| p.depth_visualization_image())
    }

    /// Resolve a click and record a marker for it
    pub fn on_view_clicked(&mut self, view: View, x: u32, y: u32) -> Result<PickResult, PickError> {
        let pipeline = self.pipeline.as_ref().ok_or(PickError::NoFrameYet)?;
        let result = match view {
            View::Depth => PickResult::Depth(pipeline.query_depth_view(x, y)?),
            View::Color => PickResult::Color(pipeline.query_color_view(x, y)?),
        };

        match self.markers.lock() {
            Ok(mut board) => board.record(view, Marker { x, y }),
            Err(e) => {
                warn!(view = %view, x, y, error = %e, "Marker board unavailable, marker not recorded");
            }
        }
        debug!(view = %view, x, y, result = %result, "Pick");
        Ok(result)
    }

    /// Flip masking; takes effect from the next color frame
    pub fn on_toggle_mask_requested(&mut self) -> MaskMode {
        let mode = self.mask.toggle();
        info!(mode = ?mode, "Mask toggled");
        mode
    }

    pub fn on_clear_markers_requested(&mut self) {
        match self.markers.lock() {
            Ok(mut board) => {
                board.clear();
                debug!("Markers cleared");
            }
            Err(e) => warn!(error = %e, "Marker board unavailable, markers not cleared"),
        }
    }

    pub fn cycle_depth_render_mode(&mut self) -> DepthRenderMode {
        self.render_mode = self.render_mode.next();
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_render_mode(self.render_mode);
        }
        info!(mode = %self.render_mode, "Depth render mode changed");
        self.render_mode
    }

    pub fn mask_mode(&self) -> MaskMode {
        self.mask.mode()
    }

    pub fn render_mode(&self) -> DepthRenderMode {
        self.render_mode
    }

    /// Shared handle to the marker board
    pub fn markers(&self) -> SharedMarkerBoard {
        self.markers.clone()
    }

    pub fn sensor_name(&self) -> Option<&str> {
        self.sensor.as_ref().map(|s| s.name())
    }

    pub fn tick_count(&self) -> u64 {
        self.pipeline.as_ref().map(|p| p.tick_count()).unwrap_or(0)
    }

    /// Fraction of color pixels with known depth in the latest mapping
    pub fn valid_pixel_ratio(&self) -> f64 {
        self.pipeline
            .as_ref()
            .map(|p| p.buffers().valid_pixel_ratio())
            .unwrap_or(0.0)
    }

    /// Stop the sensor and discard pending frames. Safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(sensor) = self.sensor.as_mut() {
            sensor.stop();
        }
        if let Some(frames) = self.frames.take() {
            let capacity = self.config.frame_queue_depth.max(1);
            let discarded = frames.try_iter().take(capacity).count();
            if discarded > 0 {
                debug!(discarded, "Discarded pending frame pairs");
            }
        }
        if self.state != SessionState::Stopped {
            info!(state = %self.state, "Session stopped");
            self.state = SessionState::Stopped;
        }
    }
}

fn format_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

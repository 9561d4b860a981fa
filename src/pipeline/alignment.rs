// SPDX-License-Identifier: GPL-3.0-only

//! Color/depth alignment
//!
//! One tick consumes the frames of one [`FramePair`]:
//!
//! 1. A depth frame is copied into the buffers and both mapping tables are
//!    requested from the coordinate mapper.
//! 2. A color frame is copied into the buffers and, when masking is on,
//!    every pixel without known depth has its channel 0 zeroed.
//!
//! A missing or malformed side leaves that stream's buffers as they were.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backends::sensor::CoordinateMapper;
use crate::backends::sensor::types::{
    ColorFrame, ColorImageFormat, ColorImagePoint, DepthFrame, DepthImageFormat, DepthImagePoint,
    FramePair,
};
use crate::constants::BYTES_PER_PIXEL;
use crate::errors::PickError;

use super::buffers::{Bitmap, FrameBuffers};
use super::mask::apply_mask;
use super::pick::{self, ColorPick, DepthPick};
use super::visualization::{DepthRenderMode, raw_depth_bytes, render_depth_bgra};

/// What a tick changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Tick counter after this tick, starting at 1
    pub tick: u64,
    pub color_updated: bool,
    pub depth_updated: bool,
    /// Color pixels blanked by the mask, 0 when masking is off
    pub masked_pixels: usize,
}

pub struct AlignmentPipeline {
    mapper: Arc<dyn CoordinateMapper>,
    buffers: FrameBuffers,
    /// Mapper output lands here first and is swapped in on success
    scratch_color_to_depth: Vec<DepthImagePoint>,
    scratch_depth_to_color: Vec<ColorImagePoint>,
    render_mode: DepthRenderMode,
    /// BGRA rendering for the non-raw modes
    depth_render: Vec<u8>,
    ticks: u64,
    /// Depth frames accepted so far; picks need at least one
    depth_frames: u64,
}

impl AlignmentPipeline {
    pub fn new(
        mapper: Arc<dyn CoordinateMapper>,
        color_format: ColorImageFormat,
        depth_format: DepthImageFormat,
        render_mode: DepthRenderMode,
    ) -> Self {
        let buffers = FrameBuffers::new(color_format, depth_format);
        let scratch_color_to_depth = buffers.color_to_depth.clone();
        let scratch_depth_to_color = buffers.depth_to_color.clone();
        let depth_render = vec![0; buffers.depth_pixels.len() * BYTES_PER_PIXEL];

        debug!(
            color = %color_format,
            depth = %depth_format,
            render_mode = %render_mode,
            "Alignment buffers allocated"
        );

        let mut pipeline = Self {
            mapper,
            buffers,
            scratch_color_to_depth,
            scratch_depth_to_color,
            render_mode,
            depth_render,
            ticks: 0,
            depth_frames: 0,
        };
        pipeline.render_depth();
        pipeline
    }

    /// Process one frame pair
    pub fn process_tick(&mut self, pair: FramePair, mask_enabled: bool) -> TickOutcome {
        self.ticks += 1;
        let mut outcome = TickOutcome {
            tick: self.ticks,
            ..Default::default()
        };

        if let Some(depth) = pair.depth {
            outcome.depth_updated = self.update_depth(&depth);
        }

        if let Some(color) = pair.color {
            outcome.color_updated = self.update_color(&color);
            if outcome.color_updated && mask_enabled {
                outcome.masked_pixels =
                    apply_mask(&mut self.buffers.color_pixels, &self.buffers.color_to_depth);
            }
        }

        outcome
    }

    fn update_depth(&mut self, frame: &DepthFrame) -> bool {
        let expected = self.buffers.depth_pixels.len();
        if frame.pixels.len() != expected {
            warn!(
                frame = frame.frame_number,
                expected,
                actual = frame.pixels.len(),
                "Depth frame has unexpected length, skipping"
            );
            return false;
        }
        self.buffers.depth_pixels.copy_from_slice(&frame.pixels);
        self.depth_frames += 1;

        let color_format = self.buffers.color_format();
        let depth_format = self.buffers.depth_format();
        let mapped = self
            .mapper
            .map_color_frame_to_depth_frame(
                color_format,
                depth_format,
                &self.buffers.depth_pixels,
                &mut self.scratch_color_to_depth,
            )
            .and_then(|()| {
                self.mapper.map_depth_frame_to_color_frame(
                    depth_format,
                    &self.buffers.depth_pixels,
                    color_format,
                    &mut self.scratch_depth_to_color,
                )
            });

        match mapped {
            Ok(()) => {
                std::mem::swap(
                    &mut self.buffers.color_to_depth,
                    &mut self.scratch_color_to_depth,
                );
                std::mem::swap(
                    &mut self.buffers.depth_to_color,
                    &mut self.scratch_depth_to_color,
                );
            }
            Err(e) => {
                warn!(frame = frame.frame_number, error = %e, "Keeping previous mapping tables");
            }
        }

        self.render_depth();
        true
    }

    fn update_color(&mut self, frame: &ColorFrame) -> bool {
        let expected = self.buffers.color_pixels.len();
        if frame.data.len() != expected {
            warn!(
                frame = frame.frame_number,
                expected,
                actual = frame.data.len(),
                "Color frame has unexpected length, skipping"
            );
            return false;
        }
        self.buffers.color_pixels.copy_from_slice(&frame.data);
        true
    }

    fn render_depth(&mut self) {
        // Raw mode borrows the sample bytes directly
        if self.render_mode != DepthRenderMode::Raw {
            render_depth_bgra(
                &self.buffers.depth_pixels,
                self.render_mode,
                &mut self.depth_render,
            );
        }
    }

    /// Latest color frame as a BGRA bitmap, masked if masking was on
    pub fn masked_color_image(&self) -> Bitmap<'_> {
        Bitmap {
            width: self.buffers.color_width(),
            height: self.buffers.color_height(),
            data: &self.buffers.color_pixels,
        }
    }

    /// Latest depth frame rendered in the current mode
    pub fn depth_visualization_image(&self) -> Bitmap<'_> {
        let data = match self.render_mode {
            DepthRenderMode::Raw => raw_depth_bytes(&self.buffers.depth_pixels),
            _ => &self.depth_render,
        };
        Bitmap {
            width: self.buffers.depth_width(),
            height: self.buffers.depth_height(),
            data,
        }
    }

    pub fn render_mode(&self) -> DepthRenderMode {
        self.render_mode
    }

    /// Switch the depth rendering and re-render the current frame
    pub fn set_render_mode(&mut self, mode: DepthRenderMode) {
        self.render_mode = mode;
        self.render_depth();
    }

    /// Both views read depth, so picks wait for the first depth frame
    pub fn query_depth_view(&self, x: u32, y: u32) -> Result<DepthPick, PickError> {
        self.require_depth_frame()?;
        pick::query_depth_view(&self.buffers, x, y)
    }

    pub fn query_color_view(&self, x: u32, y: u32) -> Result<ColorPick, PickError> {
        self.require_depth_frame()?;
        pick::query_color_view(&self.buffers, x, y)
    }

    fn require_depth_frame(&self) -> Result<(), PickError> {
        if self.depth_frames == 0 {
            return Err(PickError::NoFrameYet);
        }
        Ok(())
    }

    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Number of ticks processed so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-size frame storage
//!
//! All arrays are sized from the enabled stream formats when the pipeline is
//! built and overwritten in place every tick. Nothing here is resized.

use crate::backends::sensor::types::{
    ColorImageFormat, ColorImagePoint, DepthImageFormat, DepthImagePixel, DepthImagePoint,
};
use crate::constants::BYTES_PER_PIXEL;

/// Borrowed view of a tightly packed BGRA image (stride = width * 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl Bitmap<'_> {
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// BGRA bytes of pixel (x, y), or `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        self.data
            .get(idx..idx + BYTES_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Most recent color pixels, depth samples and both mapping tables
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    color_format: ColorImageFormat,
    depth_format: DepthImageFormat,
    pub(super) color_pixels: Vec<u8>,
    pub(super) depth_pixels: Vec<DepthImagePixel>,
    pub(super) color_to_depth: Vec<DepthImagePoint>,
    pub(super) depth_to_color: Vec<ColorImagePoint>,
}

impl FrameBuffers {
    pub fn new(color_format: ColorImageFormat, depth_format: DepthImageFormat) -> Self {
        let color_pixels = color_format.pixel_count();
        let depth_pixels = depth_format.frame_pixel_data_length();
        Self {
            color_format,
            depth_format,
            color_pixels: vec![0; color_pixels * BYTES_PER_PIXEL],
            depth_pixels: vec![DepthImagePixel::UNKNOWN; depth_pixels],
            color_to_depth: vec![DepthImagePoint::UNKNOWN; color_pixels],
            depth_to_color: vec![ColorImagePoint::INVALID; depth_pixels],
        }
    }

    pub fn color_format(&self) -> ColorImageFormat {
        self.color_format
    }

    pub fn depth_format(&self) -> DepthImageFormat {
        self.depth_format
    }

    /// BGR32 bytes of the latest color frame, after masking
    pub fn color_pixels(&self) -> &[u8] {
        &self.color_pixels
    }

    pub fn depth_pixels(&self) -> &[DepthImagePixel] {
        &self.depth_pixels
    }

    /// One entry per color pixel, in depth-image space
    pub fn color_to_depth(&self) -> &[DepthImagePoint] {
        &self.color_to_depth
    }

    /// One entry per depth pixel, in color-image space
    pub fn depth_to_color(&self) -> &[ColorImagePoint] {
        &self.depth_to_color
    }

    pub fn color_width(&self) -> u32 {
        self.color_format.width()
    }

    pub fn color_height(&self) -> u32 {
        self.color_format.height()
    }

    pub fn depth_width(&self) -> u32 {
        self.depth_format.width()
    }

    pub fn depth_height(&self) -> u32 {
        self.depth_format.height()
    }

    /// Fraction of color pixels with a known depth in the current table
    pub fn valid_pixel_ratio(&self) -> f64 {
        if self.color_to_depth.is_empty() {
            return 0.0;
        }
        let known = self.color_to_depth.iter().filter(|p| p.is_known()).count();
        known as f64 / self.color_to_depth.len() as f64
    }
}

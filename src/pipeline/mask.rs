// SPDX-License-Identifier: GPL-3.0-only

//! Validity masking of color pixels

use crate::backends::sensor::types::DepthImagePoint;
use crate::constants::BYTES_PER_PIXEL;

/// Whether color pixels without a known depth are blanked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Zero channel 0 of every pixel without known depth
    MaskInvalid,
    /// Show the color frame untouched
    ShowAll,
}

/// Two-valued masking state that wraps around on every toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskToggle {
    mode: MaskMode,
}

impl MaskToggle {
    pub fn new(enabled: bool) -> Self {
        let mode = if enabled {
            MaskMode::MaskInvalid
        } else {
            MaskMode::ShowAll
        };
        Self { mode }
    }

    /// Flip the state and return the new mode
    pub fn toggle(&mut self) -> MaskMode {
        self.mode = match self.mode {
            MaskMode::MaskInvalid => MaskMode::ShowAll,
            MaskMode::ShowAll => MaskMode::MaskInvalid,
        };
        self.mode
    }

    pub fn mode(&self) -> MaskMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode == MaskMode::MaskInvalid
    }
}

impl Default for MaskToggle {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Zero byte `i * 4` of every color pixel `i` whose mapping entry has no depth
///
/// Under BGR32 that byte is the blue channel. Returns the number of pixels
/// touched.
pub fn apply_mask(color_pixels: &mut [u8], color_to_depth: &[DepthImagePoint]) -> usize {
    let mut masked = 0;
    for (pixel, point) in color_pixels
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .zip(color_to_depth)
    {
        if !point.is_known() {
            pixel[0] = 0;
            masked += 1;
        }
    }
    masked
}

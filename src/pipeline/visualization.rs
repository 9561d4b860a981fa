// SPDX-License-Identifier: GPL-3.0-only

//! Depth visualization helpers
//!
//! Converts depth samples to displayable BGRA:
//! - Raw: the sample bytes reinterpreted as pixels
//! - Grayscale (bright=near, dark=far)
//! - Turbo colormap (blue=near, red=far)

use serde::{Deserialize, Serialize};

use crate::backends::sensor::types::DepthImagePixel;
use crate::constants::{BYTES_PER_PIXEL, DEPTH_COLORMAP_BANDS, DEPTH_MAX_MM, DEPTH_MIN_MM};

/// How the depth view turns samples into pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthRenderMode {
    /// Depth sample bytes shown as BGRA without conversion
    #[default]
    Raw,
    Grayscale,
    Colormap,
}

impl DepthRenderMode {
    /// Next mode in display order, wrapping around
    pub fn next(self) -> Self {
        match self {
            Self::Raw => Self::Grayscale,
            Self::Grayscale => Self::Colormap,
            Self::Colormap => Self::Raw,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Grayscale => "grayscale",
            Self::Colormap => "colormap",
        }
    }
}

impl std::fmt::Display for DepthRenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Turbo colormap: perceptually uniform rainbow (blue=near, red=far)
///
/// Based on: https://ai.googleblog.com/2019/08/turbo-improved-rainbow-colormap-for.html
/// Polynomial approximation, returned as BGRA.
#[inline]
fn turbo(t: f32) -> [u8; 4] {
    let r = (0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144)))))
        .clamp(0.0, 1.0);
    let g = (0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377)))))
        .clamp(0.0, 1.0);
    let b = (0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388)))))
        .clamp(0.0, 1.0);
    [(b * 255.0) as u8, (g * 255.0) as u8, (r * 255.0) as u8, 255]
}

/// Normalize a depth in millimeters to 0.0 (near) ..= 1.0 (far)
#[inline]
fn normalized(depth_mm: i16) -> f32 {
    ((depth_mm as f32 - DEPTH_MIN_MM) / (DEPTH_MAX_MM - DEPTH_MIN_MM)).clamp(0.0, 1.0)
}

/// The depth samples as the byte sequence a BGRA bitmap would show
pub fn raw_depth_bytes(depth: &[DepthImagePixel]) -> &[u8] {
    bytemuck::cast_slice(depth)
}

/// Render depth samples into a preallocated BGRA buffer
///
/// `out` must hold exactly four bytes per sample. Unknown depth renders black
/// in the grayscale and colormap modes.
pub fn render_depth_bgra(depth: &[DepthImagePixel], mode: DepthRenderMode, out: &mut [u8]) {
    debug_assert_eq!(out.len(), depth.len() * BYTES_PER_PIXEL);

    let colorize: fn(f32) -> [u8; 4] = match mode {
        DepthRenderMode::Raw => {
            out.copy_from_slice(raw_depth_bytes(depth));
            return;
        }
        DepthRenderMode::Grayscale => gray,
        DepthRenderMode::Colormap => banded_turbo,
    };

    for (sample, pixel) in depth.iter().zip(out.chunks_exact_mut(BYTES_PER_PIXEL)) {
        if sample.is_known_depth() {
            pixel.copy_from_slice(&colorize(normalized(sample.depth)));
        } else {
            pixel.copy_from_slice(&[0, 0, 0, 255]);
        }
    }
}

/// Grayscale: near=bright, far=dark
fn gray(t: f32) -> [u8; 4] {
    let v = ((1.0 - t) * 255.0) as u8;
    [v, v, v, 255]
}

/// Turbo quantized to bands for smoother visualization
fn banded_turbo(t: f32) -> [u8; 4] {
    turbo((t * DEPTH_COLORMAP_BANDS).floor() / DEPTH_COLORMAP_BANDS)
}

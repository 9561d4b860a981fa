// SPDX-License-Identifier: GPL-3.0-only

//! Pixel picking and click markers
//!
//! A pick resolves a clicked pixel against the buffers of the most recent
//! tick. The depth view is indexed with the depth frame width, the color
//! view with the color frame width, so both assume the view renders at the
//! stream's native resolution.

use std::sync::{Arc, Mutex};

use crate::backends::sensor::types::ColorImagePoint;
use crate::constants::MM_PER_METER;
use crate::errors::PickError;

use super::buffers::FrameBuffers;

/// Which of the two views was clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Color,
    Depth,
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Color => write!(f, "color"),
            View::Depth => write!(f, "depth"),
        }
    }
}

/// Depth readout for a clicked pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DepthReading {
    Meters(f64),
    Unknown,
}

impl DepthReading {
    /// Reading for a depth in millimeters; zero or negative is unknown
    pub fn from_mm(depth_mm: i32) -> Self {
        if depth_mm > 0 {
            DepthReading::Meters(depth_mm as f64 / MM_PER_METER)
        } else {
            DepthReading::Unknown
        }
    }

    pub fn meters(&self) -> Option<f64> {
        match self {
            DepthReading::Meters(m) => Some(*m),
            DepthReading::Unknown => None,
        }
    }
}

impl std::fmt::Display for DepthReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepthReading::Meters(m) => write!(f, "{} meters", m),
            DepthReading::Unknown => write!(f, "unknown depth"),
        }
    }
}

/// Result of clicking the depth view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthPick {
    pub reading: DepthReading,
    /// Where the sample lands in the color image, present when depth is known
    pub color_point: Option<ColorImagePoint>,
}

/// Result of clicking the color view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPick {
    pub reading: DepthReading,
    /// The clicked coordinate, echoed back
    pub pixel: (u32, u32),
}

/// Either kind of pick, as returned by the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickResult {
    Depth(DepthPick),
    Color(ColorPick),
}

impl PickResult {
    pub fn reading(&self) -> DepthReading {
        match self {
            PickResult::Depth(pick) => pick.reading,
            PickResult::Color(pick) => pick.reading,
        }
    }
}

impl std::fmt::Display for PickResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickResult::Depth(pick) => match pick.color_point {
                Some(point) => write!(f, "{} | {}", pick.reading, point),
                None => write!(f, "{}", pick.reading),
            },
            PickResult::Color(pick) => write!(
                f,
                "{} | x: {} y: {}",
                pick.reading, pick.pixel.0, pick.pixel.1
            ),
        }
    }
}

fn index_of(x: u32, y: u32, width: u32, height: u32, len: usize) -> Result<usize, PickError> {
    let out_of_range = PickError::IndexOutOfRange {
        x,
        y,
        width,
        height,
    };
    if x >= width || y >= height {
        return Err(out_of_range);
    }
    let index = x as usize + y as usize * width as usize;
    if index >= len {
        return Err(out_of_range);
    }
    Ok(index)
}

/// Resolve a click on the depth view
pub fn query_depth_view(buffers: &FrameBuffers, x: u32, y: u32) -> Result<DepthPick, PickError> {
    let index = index_of(
        x,
        y,
        buffers.depth_width(),
        buffers.depth_height(),
        buffers.depth_pixels().len(),
    )?;

    let sample = buffers.depth_pixels()[index];
    if !sample.is_known_depth() {
        return Ok(DepthPick {
            reading: DepthReading::Unknown,
            color_point: None,
        });
    }
    Ok(DepthPick {
        reading: DepthReading::from_mm(sample.depth as i32),
        color_point: buffers.depth_to_color().get(index).copied(),
    })
}

/// Resolve a click on the color view
pub fn query_color_view(buffers: &FrameBuffers, x: u32, y: u32) -> Result<ColorPick, PickError> {
    let index = index_of(
        x,
        y,
        buffers.color_width(),
        buffers.color_height(),
        buffers.color_to_depth().len(),
    )?;

    Ok(ColorPick {
        reading: DepthReading::from_mm(buffers.color_to_depth()[index].depth),
        pixel: (x, y),
    })
}

/// A clicked point in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub x: u32,
    pub y: u32,
}

/// Copy of both marker lists taken under one lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSnapshot {
    pub color: Vec<Marker>,
    pub depth: Vec<Marker>,
}

impl MarkerSnapshot {
    pub fn for_view(&self, view: View) -> &[Marker] {
        match view {
            View::Color => &self.color,
            View::Depth => &self.depth,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_empty() && self.depth.is_empty()
    }
}

/// Append-only marker lists, one per view
#[derive(Debug, Default)]
pub struct MarkerBoard {
    color: Vec<Marker>,
    depth: Vec<Marker>,
}

/// Marker board shared between the session and render code
pub type SharedMarkerBoard = Arc<Mutex<MarkerBoard>>;

impl MarkerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMarkerBoard {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn record(&mut self, view: View, marker: Marker) {
        match view {
            View::Color => self.color.push(marker),
            View::Depth => self.depth.push(marker),
        }
    }

    /// Empty both lists
    pub fn clear(&mut self) {
        self.color.clear();
        self.depth.clear();
    }

    pub fn len(&self) -> usize {
        self.color.len() + self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> MarkerSnapshot {
        MarkerSnapshot {
            color: self.color.clone(),
            depth: self.depth.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sensor::types::{ColorImageFormat, DepthImageFormat, DepthImagePixel};

    fn buffers() -> FrameBuffers {
        FrameBuffers::new(
            ColorImageFormat::RgbResolution640x480Fps30,
            DepthImageFormat::Resolution320x240Fps30,
        )
    }

    #[test]
    fn test_depth_pick_reports_meters_exactly() {
        let mut buffers = buffers();
        buffers.depth_pixels[5 + 3 * 320] = DepthImagePixel::new(1500);
        buffers.depth_to_color[5 + 3 * 320] = ColorImagePoint { x: 17, y: 9 };

        let pick = query_depth_view(&buffers, 5, 3).unwrap();
        assert_eq!(pick.reading, DepthReading::Meters(1.5));
        assert_eq!(pick.color_point, Some(ColorImagePoint { x: 17, y: 9 }));
    }

    #[test]
    fn test_unknown_depth_is_never_numeric() {
        let buffers = buffers();
        let pick = query_depth_view(&buffers, 0, 0).unwrap();
        assert_eq!(pick.reading, DepthReading::Unknown);
        assert_eq!(pick.reading.meters(), None);
        assert_eq!(pick.color_point, None);

        let pick = query_color_view(&buffers, 639, 479).unwrap();
        assert_eq!(pick.reading, DepthReading::Unknown);
        assert_eq!(pick.pixel, (639, 479));
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let buffers = buffers();
        assert_eq!(
            query_depth_view(&buffers, 320, 0),
            Err(PickError::IndexOutOfRange {
                x: 320,
                y: 0,
                width: 320,
                height: 240
            })
        );
        assert!(query_color_view(&buffers, 0, 480).is_err());
        // In range for the color view but not the depth view
        assert!(query_depth_view(&buffers, 400, 10).is_err());
        assert!(query_color_view(&buffers, 400, 10).is_ok());
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(DepthReading::Meters(2.0).to_string(), "2 meters");
        assert_eq!(DepthReading::Meters(1.234).to_string(), "1.234 meters");
        assert_eq!(DepthReading::Unknown.to_string(), "unknown depth");
        assert_eq!(DepthReading::from_mm(0), DepthReading::Unknown);
    }

    #[test]
    fn test_marker_board_clear_empties_both_views() {
        let mut board = MarkerBoard::new();
        board.record(View::Color, Marker { x: 1, y: 2 });
        board.record(View::Depth, Marker { x: 3, y: 4 });
        assert_eq!(board.snapshot().for_view(View::Depth), &[Marker { x: 3, y: 4 }]);

        board.clear();
        assert!(board.snapshot().is_empty());
        assert!(board.is_empty());
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Color/depth alignment pipeline
//!
//! ```text
//! FramePair ──► AlignmentPipeline ──► FrameBuffers ──► Bitmap (color, masked)
//!                    │    ▲                 │      └─► Bitmap (depth, rendered)
//!                    ▼    │                 ▼
//!              CoordinateMapper          pick queries
//! ```
//!
//! - [`buffers`]: fixed-size storage for pixels and mapping tables
//! - [`alignment`]: per-tick processing
//! - [`mask`]: validity masking and its on/off state
//! - [`pick`]: click resolution and markers
//! - [`visualization`]: depth rendering modes

pub mod alignment;
pub mod buffers;
pub mod mask;
pub mod pick;
pub mod visualization;

pub use alignment::{AlignmentPipeline, TickOutcome};
pub use buffers::{Bitmap, FrameBuffers};
pub use mask::{MaskMode, MaskToggle};
pub use pick::{
    ColorPick, DepthPick, DepthReading, Marker, MarkerBoard, MarkerSnapshot, PickResult,
    SharedMarkerBoard, View,
};
pub use visualization::DepthRenderMode;

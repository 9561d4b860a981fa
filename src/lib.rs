// SPDX-License-Identifier: GPL-3.0-only

//! Kinect V1 color/depth alignment
//!
//! Shows live color and depth video side by side, blanks color pixels that
//! have no known depth, and answers "how far is this pixel" for clicks in
//! either view.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: sensor collaborator traits, the simulated Kinect V1,
//!   discovery and capture thread management
//! - [`pipeline`]: per-tick alignment, masking, depth rendering and picking
//! - [`session`]: the UI-facing surface tying a sensor to a pipeline
//! - [`terminal`]: ratatui viewer
//! - [`config`]: user configuration handling
//!
//! # Example
//!
//! ```ignore
//! let config = Config::default();
//! let sensor = open_first_connected(&config.simulator);
//! let mut session = Session::new(sensor, config);
//! session.start()?;
//! session.pump(&mut my_viewport);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipeline;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use session::{Session, SessionState, ViewportAdapter};

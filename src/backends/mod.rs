// SPDX-License-Identifier: GPL-3.0-only

//! Backend layer for depth sensors
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Session                     │
//! └────────────────────┬────────────────────────┘
//!                      │ DepthSensor / CoordinateMapper
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │  Discovery  │    │ SimulatedKinect  │   │
//! │  └─────────────┘    └────────┬─────────┘   │
//! │                     ┌────────┴─────────┐   │
//! │                     │   frame_loop     │   │
//! │                     └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`sensor`]: collaborator traits, shared types and the simulated sensor
//! - [`frame_loop`]: capture thread lifecycle

pub mod frame_loop;
pub mod sensor;

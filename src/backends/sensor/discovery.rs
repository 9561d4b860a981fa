// SPDX-License-Identifier: GPL-3.0-only

//! Sensor discovery
//!
//! Resolves "the first connected device" outside the alignment core. The
//! session only ever receives the resolved handle, so swapping in another
//! discovery strategy does not touch the pipeline.

use tracing::{debug, info};

use super::DepthSensor;
use super::simulated::SimulatedKinect;
use super::types::{SensorInfo, SensorStatus};
use crate::config::SimulatorConfig;

/// Enumerate the sensors this build knows how to open
pub fn enumerate_sensors(settings: &SimulatorConfig) -> Vec<SensorInfo> {
    let sensors: Vec<SensorInfo> = (0..settings.device_count)
        .map(|index| SimulatedKinect::new(index, settings.clone()).info())
        .collect();

    for sensor in &sensors {
        info!(
            name = %sensor.name,
            path = %sensor.path,
            status = %sensor.status,
            "Found sensor"
        );
    }
    sensors
}

/// Open the first sensor whose status is `Connected`
///
/// Returns `None` when nothing is connected; callers treat that as the
/// "no sensor" state rather than an error.
pub fn open_first_connected(settings: &SimulatorConfig) -> Option<Box<dyn DepthSensor>> {
    let first = enumerate_sensors(settings)
        .into_iter()
        .position(|info| info.status == SensorStatus::Connected);

    match first {
        Some(index) => {
            let sensor = SimulatedKinect::new(index, settings.clone());
            debug!(path = %sensor.path(), "Opening first connected sensor");
            Some(Box::new(sensor))
        }
        None => {
            info!("No connected sensor found");
            None
        }
    }
}

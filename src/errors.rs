// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the alignment core and its front ends

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for sensor collaborator operations
pub type SensorResult<T> = Result<T, SensorError>;

/// Main application error type
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Sensor collaborator errors
    Sensor(SensorError),
    /// Configuration errors (bad file, unsupported stream format)
    Config(String),
    /// Terminal front end errors
    Terminal(String),
    /// Generic error with message
    Other(String),
}

/// Errors reported by a depth sensor or its coordinate mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// No connected sensor could be resolved
    NoSensorFound,
    /// The device exists but cannot be claimed (already in use)
    DeviceBusy(String),
    /// Requested stream format is not offered by this sensor
    UnsupportedFormat(String),
    /// An operation needed a stream that was never enabled
    StreamNotEnabled(&'static str),
    /// `start()` called on a running sensor
    AlreadyRunning,
    /// Coordinate mapping could not be computed
    MappingFailed(String),
    /// Underlying I/O failure
    Io(String),
}

/// Errors from resolving a clicked pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickError {
    /// Clicked coordinate lies outside the frame the view indexes into
    IndexOutOfRange {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// No depth frame has been processed yet, either because the session
    /// has not started or because the first frame is still in flight
    NoFrameYet,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Sensor(e) => write!(f, "Sensor error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NoSensorFound => write!(f, "No connected sensor found"),
            SensorError::DeviceBusy(msg) => write!(f, "Device is busy: {}", msg),
            SensorError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            SensorError::StreamNotEnabled(stream) => write!(f, "{} stream is not enabled", stream),
            SensorError::AlreadyRunning => write!(f, "Sensor is already running"),
            SensorError::MappingFailed(msg) => write!(f, "Coordinate mapping failed: {}", msg),
            SensorError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickError::IndexOutOfRange {
                x,
                y,
                width,
                height,
            } => write!(
                f,
                "Pixel ({}, {}) is outside the {}x{} frame",
                x, y, width, height
            ),
            PickError::NoFrameYet => write!(f, "No depth frame has been processed yet"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SensorError {}
impl std::error::Error for PickError {}

impl SensorError {
    /// Whether this error means "no sensor available" rather than a bug
    ///
    /// The session treats these as the idle state instead of failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SensorError::NoSensorFound | SensorError::DeviceBusy(_) | SensorError::Io(_)
        )
    }
}

// An unsupported stream format is a configuration problem, not a device fault
impl From<SensorError> for AppError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::UnsupportedFormat(msg) => AppError::Config(msg),
            other => AppError::Sensor(other),
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Terminal(err.to_string())
    }
}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

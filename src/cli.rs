// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for sensor inspection
//!
//! This module provides command-line functionality for:
//! - Listing sensors and their stream formats
//! - Running the alignment pipeline headless

use kinect_colordepth::backends::sensor::{enumerate_sensors, open_first_connected};
use kinect_colordepth::config::Config;
use kinect_colordepth::pipeline::{Bitmap, TickOutcome, View};
use kinect_colordepth::session::{Session, SessionState, ViewportAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// List all available sensors and the formats they offer
pub fn list_formats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let sensors = enumerate_sensors(&config.simulator);

    if sensors.is_empty() {
        println!("No sensors found.");
        return Ok(());
    }

    println!("Available sensors:");
    println!();
    for (index, sensor) in sensors.iter().enumerate() {
        println!("  [{}] {} ({}, {})", index, sensor.name, sensor.path, sensor.status);
        println!("      Color:");
        for format in &sensor.color_formats {
            let marker = if *format == config.color_format { "*" } else { " " };
            println!("       {} {}", marker, format);
        }
        println!("      Depth:");
        for format in &sensor.depth_formats {
            let marker = if *format == config.depth_format { "*" } else { " " };
            println!("       {} {}", marker, format);
        }
        println!();
    }
    println!("  * configured");

    Ok(())
}

/// Logs every tick it is shown
struct ProbeViewport;

impl ViewportAdapter for ProbeViewport {
    fn present(&mut self, color: Bitmap<'_>, depth: Bitmap<'_>, outcome: &TickOutcome) {
        info!(
            tick = outcome.tick,
            color_updated = outcome.color_updated,
            depth_updated = outcome.depth_updated,
            masked_pixels = outcome.masked_pixels,
            color_bytes = color.data.len(),
            depth_bytes = depth.data.len(),
            "Tick"
        );
    }
}

/// Run the pipeline for `ticks` frame pairs without a UI
pub fn probe(
    mut config: Config,
    ticks: u64,
    no_mask: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if no_mask {
        config.mask_invalid_on_start = false;
    }

    let sensor = open_first_connected(&config.simulator);
    let mut session = Session::new(sensor, config);
    if session.start()? == SessionState::NoSensor {
        println!("No sensor available.");
        return Ok(());
    }
    println!(
        "Using sensor: {}",
        session.sensor_name().unwrap_or("unknown")
    );

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let started = Instant::now();
    let mut viewport = ProbeViewport;
    let mut processed = 0u64;
    while processed < ticks {
        if stop_flag.load(Ordering::SeqCst) {
            println!("Stopping early...");
            break;
        }
        let n = session.pump(&mut viewport) as u64;
        if n == 0 {
            if session.state() == SessionState::Stopped {
                println!("Sensor stopped delivering frames.");
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        processed += n;
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "Processed {} ticks in {:.2}s ({:.1} ticks/s)",
        processed,
        elapsed,
        processed as f64 / elapsed.max(f64::EPSILON)
    );
    println!(
        "Valid color pixels: {:.1}%",
        session.valid_pixel_ratio() * 100.0
    );

    for view in [View::Color, View::Depth] {
        let image = match view {
            View::Color => session.masked_color_image(),
            View::Depth => session.depth_visualization_image(),
        };
        let Some((cx, cy)) = image.map(|i| (i.width / 2, i.height / 2)) else {
            continue;
        };
        match session.on_view_clicked(view, cx, cy) {
            Ok(result) => println!("Center of {} view ({}, {}): {}", view, cx, cy, result),
            Err(e) => println!("Center of {} view: {}", view, e),
        }
    }

    session.shutdown();
    Ok(())
}

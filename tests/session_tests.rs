// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the session surface

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use common::*;
use kinect_colordepth::backends::sensor::{
    ColorImageFormat, ColorImagePoint, DepthImageFormat, DepthImagePixel, SimulatedKinect,
};
use kinect_colordepth::config::{Config, SimulatorConfig};
use kinect_colordepth::errors::{AppError, PickError};
use kinect_colordepth::pipeline::{Bitmap, DepthReading, MaskMode, PickResult, TickOutcome, View};
use kinect_colordepth::session::{Session, SessionState, ViewportAdapter};

fn scripted_session(config: Config) -> (Session, Feed) {
    let (sensor, feed) = ScriptedSensor::new();
    let mut session = Session::new(Some(Box::new(sensor)), config);
    assert_eq!(session.start().unwrap(), SessionState::Streaming);
    (session, feed)
}

#[test]
fn test_no_sensor_is_idle_not_fatal() {
    let mut session = Session::new(None, Config::default());
    assert_eq!(session.start().unwrap(), SessionState::NoSensor);
    assert_eq!(session.pump(&mut RecordingViewport::default()), 0);
    assert!(session.masked_color_image().is_none());
}

#[test]
fn test_busy_device_leaves_session_without_sensor() {
    let mut session = Session::new(Some(Box::new(ScriptedSensor::busy())), Config::default());
    assert_eq!(session.start().unwrap(), SessionState::NoSensor);
    assert_eq!(session.state(), SessionState::NoSensor);
    assert_eq!(session.pump(&mut RecordingViewport::default()), 0);
}

#[test]
fn test_busy_simulated_device() {
    let settings = SimulatorConfig {
        device_busy: true,
        ..Default::default()
    };
    let sensor = SimulatedKinect::new(0, settings);
    let mut session = Session::new(Some(Box::new(sensor)), Config::default());
    assert_eq!(session.start().unwrap(), SessionState::NoSensor);
}

#[test]
fn test_unsupported_color_format_is_config_error() {
    let config = Config {
        color_format: ColorImageFormat::RawBayerResolution640x480Fps30,
        ..Default::default()
    };
    let (sensor, _feed) = ScriptedSensor::new();
    let mut session = Session::new(Some(Box::new(sensor)), config);

    let err = session.start().unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {:?}", err);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.tick_count(), 0);
}

#[test]
fn test_unsupported_depth_format_names_supported_ones() {
    let config = Config {
        depth_format: DepthImageFormat::Resolution80x60Fps30,
        ..Default::default()
    };
    let (sensor, _feed) = ScriptedSensor::new();
    let mut session = Session::new(Some(Box::new(sensor)), config);

    let AppError::Config(msg) = session.start().unwrap_err() else {
        panic!("expected a configuration error");
    };
    assert!(msg.contains("Resolution320x240Fps30"), "message: {}", msg);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_pick_before_start_has_no_frame() {
    let mut session = Session::new(None, Config::default());
    assert_eq!(
        session.on_view_clicked(View::Depth, 0, 0),
        Err(PickError::NoFrameYet)
    );
}

#[test]
fn test_image_sizes_constant_across_ticks() {
    let (mut session, feed) = scripted_session(Config::default());
    let mut viewport = RecordingViewport::default();

    for tick in 0..3 {
        feed.send(pair(Some(color_frame(tick)), Some(depth_frame(1000))));
        assert_eq!(session.pump(&mut viewport), 1);
    }
    feed.send(pair(None, Some(depth_frame(1000))));
    session.pump(&mut viewport);

    assert_eq!(viewport.outcomes.len(), 4);
    assert!(viewport.color_lengths.iter().all(|&l| l == 640 * 480 * 4));
    assert!(viewport.depth_lengths.iter().all(|&l| l == 320 * 240 * 4));
    assert_eq!(session.tick_count(), 4);
}

#[test]
fn test_masking_law() {
    let (mut session, feed) = scripted_session(Config::default());
    let mut viewport = RecordingViewport::default();

    feed.send(pair(Some(color_frame(255)), Some(depth_frame(1500))));
    session.pump(&mut viewport);
    {
        let image = session.masked_color_image().unwrap();
        // Color (0, 0) maps to depth (0, 0), which has no reading
        assert_eq!(image.pixel(0, 0), Some([0, 255, 255, 255]));
        // Color (400, 0) maps to depth (200, 0), which does
        assert_eq!(image.pixel(400, 0), Some([255; 4]));
    }

    assert_eq!(session.on_toggle_mask_requested(), MaskMode::ShowAll);
    feed.send(pair(Some(color_frame(255)), Some(depth_frame(1500))));
    session.pump(&mut viewport);
    let image = session.masked_color_image().unwrap();
    assert_eq!(image.pixel(0, 0), Some([255; 4]));
}

#[test]
fn test_mask_disabled_from_config() {
    let config = Config {
        mask_invalid_on_start: false,
        ..Default::default()
    };
    let (mut session, feed) = scripted_session(config);
    feed.send(pair(Some(color_frame(90)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());
    assert!(session.masked_color_image().unwrap().data.iter().all(|&b| b == 90));
}

#[test]
fn test_depth_pick_matches_mapping_table() {
    let (mut session, feed) = scripted_session(Config::default());
    let mut depth = depth_frame(1000);
    depth.pixels[42] = DepthImagePixel::new(2000);
    feed.send(pair(Some(color_frame(1)), Some(depth)));
    session.pump(&mut RecordingViewport::default());

    let result = session.on_view_clicked(View::Depth, 42, 0).unwrap();
    let PickResult::Depth(pick) = result else {
        panic!("expected a depth pick, got {:?}", result);
    };
    assert_eq!(pick.reading, DepthReading::Meters(2.0));
    assert_eq!(pick.color_point, Some(ColorImagePoint { x: 84, y: 0 }));
}

#[test]
fn test_color_pick_reads_mapped_depth() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());

    let known = session.on_view_clicked(View::Color, 400, 100).unwrap();
    assert_eq!(known.reading(), DepthReading::Meters(1.5));
    let unknown = session.on_view_clicked(View::Color, 10, 0).unwrap();
    assert_eq!(unknown.reading(), DepthReading::Unknown);
}

#[test]
fn test_clear_after_two_picks() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());

    session.on_view_clicked(View::Color, 100, 100).unwrap();
    session.on_view_clicked(View::Depth, 50, 50).unwrap();
    let markers = session.markers();
    assert_eq!(markers.lock().unwrap().len(), 2);

    session.on_clear_markers_requested();
    let snapshot = markers.lock().unwrap().snapshot();
    assert!(snapshot.color.is_empty());
    assert!(snapshot.depth.is_empty());
}

#[test]
fn test_out_of_range_pick_records_nothing() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());

    // Inside the color frame but past the depth frame's width
    let err = session.on_view_clicked(View::Depth, 400, 10).unwrap_err();
    assert!(matches!(err, PickError::IndexOutOfRange { width: 320, .. }));
    assert!(session.markers().lock().unwrap().is_empty());
}

#[test]
fn test_dropped_color_keeps_previous_color() {
    let (mut session, feed) = scripted_session(Config::default());
    let mut viewport = RecordingViewport::default();
    feed.send(pair(Some(color_frame(60)), Some(depth_frame(1000))));
    feed.send(pair(None, Some(depth_frame(3000))));
    assert_eq!(session.pump(&mut viewport), 2);

    assert!(!viewport.outcomes[1].color_updated);
    assert!(viewport.outcomes[1].depth_updated);
    let pick = session.on_view_clicked(View::Depth, 300, 200).unwrap();
    assert_eq!(pick.reading(), DepthReading::Meters(3.0));
    let image = session.masked_color_image().unwrap();
    assert_eq!(image.pixel(600, 400), Some([60; 4]));
}

#[test]
fn test_render_mode_cycles() {
    let (mut session, _feed) = scripted_session(Config::default());
    let start = session.render_mode();
    session.cycle_depth_render_mode();
    assert_ne!(session.render_mode(), start);
    session.cycle_depth_render_mode();
    session.cycle_depth_render_mode();
    assert_eq!(session.render_mode(), start);
}

#[test]
fn test_sensor_disconnect_stops_session() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.disconnect();
    assert_eq!(session.pump(&mut RecordingViewport::default()), 0);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn test_shutdown_is_idempotent() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), None));
    session.shutdown();
    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.pump(&mut RecordingViewport::default()), 0);
    assert!(session.start().is_err());
}

#[test]
fn test_simulated_sensor_end_to_end() {
    let config = Config {
        simulator: SimulatorConfig {
            frame_rate_override: Some(200),
            ..Default::default()
        },
        ..Default::default()
    };
    let sensor = SimulatedKinect::new(0, config.simulator.clone());
    let mut session = Session::new(Some(Box::new(sensor)), config);
    assert_eq!(session.start().unwrap(), SessionState::Streaming);

    let mut viewport = RecordingViewport::default();
    let deadline = Instant::now() + Duration::from_secs(10);
    while viewport.outcomes.len() < 3 && Instant::now() < deadline {
        if session.pump(&mut viewport) == 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
    }
    assert!(viewport.outcomes.len() >= 3);

    // Shadow band and too-far corner leave part of the color frame unmapped
    let ratio = session.valid_pixel_ratio();
    assert!(ratio > 0.5 && ratio < 1.0, "ratio = {}", ratio);
    let image = session.masked_color_image().unwrap();
    assert_eq!(image.pixel(0, 240).map(|p| p[0]), Some(0));

    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn test_pick_before_first_depth_frame_has_no_frame() {
    let (mut session, feed) = scripted_session(Config::default());
    assert_eq!(
        session.on_view_clicked(View::Color, 10, 10),
        Err(PickError::NoFrameYet)
    );

    feed.send(pair(Some(color_frame(3)), None));
    session.pump(&mut RecordingViewport::default());
    assert_eq!(
        session.on_view_clicked(View::Depth, 10, 10),
        Err(PickError::NoFrameYet)
    );
    assert!(session.markers().lock().unwrap().is_empty());

    feed.send(pair(None, Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());
    assert_eq!(
        session.on_view_clicked(View::Depth, 10, 10).unwrap().reading(),
        DepthReading::Meters(1.5)
    );
}

/// Takes a little longer per frame than the sensor needs to produce one
struct SlowViewport {
    presented: usize,
}

impl ViewportAdapter for SlowViewport {
    fn present(&mut self, _color: Bitmap<'_>, _depth: Bitmap<'_>, _outcome: &TickOutcome) {
        std::thread::sleep(Duration::from_millis(2));
        self.presented += 1;
    }
}

#[test]
fn test_pump_returns_while_sensor_floods_queue() {
    let config = Config::default();
    let budget = config.frame_queue_depth;
    let mut session = Session::new(Some(Box::new(FloodSensor::default())), config);
    assert_eq!(session.start().unwrap(), SessionState::Streaming);

    let mut viewport = SlowViewport { presented: 0 };
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut calls = 0;
    while viewport.presented < 20 {
        assert!(Instant::now() < deadline, "pump did not hand control back");
        let processed = session.pump(&mut viewport);
        assert!(processed <= budget, "{} ticks in one call", processed);
        calls += 1;
    }
    assert!(calls >= 20 / budget);

    session.shutdown();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn test_poisoned_marker_board_still_answers_picks() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());

    let markers = session.markers();
    let poisoner = std::thread::spawn(move || {
        let _board = markers.lock().unwrap();
        panic!("render thread died holding the board");
    });
    assert!(poisoner.join().is_err());

    let pick = session.on_view_clicked(View::Color, 400, 100).unwrap();
    assert_eq!(pick.reading(), DepthReading::Meters(1.5));
    session.on_clear_markers_requested();
    assert!(session.markers().lock().is_err());
}

#[test]
fn test_snapshots_never_see_partial_updates() {
    let (mut session, feed) = scripted_session(Config::default());
    feed.send(pair(Some(color_frame(1)), Some(depth_frame(1500))));
    session.pump(&mut RecordingViewport::default());

    let markers = session.markers();
    let done = Arc::new(AtomicBool::new(false));
    let reader_done = Arc::clone(&done);
    let reader = std::thread::spawn(move || {
        let mut snapshots = 0u32;
        loop {
            let finished = reader_done.load(Ordering::SeqCst);
            let snapshot = markers.lock().unwrap().snapshot();
            // Clicks alternate color then depth; a clear empties both at once
            let (color, depth) = (snapshot.color.len(), snapshot.depth.len());
            assert!(depth <= color && color <= depth + 1, "color {} depth {}", color, depth);
            snapshots += 1;
            if finished {
                break snapshots;
            }
        }
    });

    for round in 0..200u32 {
        for i in 0..5 {
            session.on_view_clicked(View::Color, 400 + i, 100).unwrap();
            session.on_view_clicked(View::Depth, 200 + i, 50).unwrap();
        }
        if round % 3 == 0 {
            session.on_clear_markers_requested();
        }
    }
    done.store(true, Ordering::SeqCst);

    assert!(reader.join().unwrap() > 0);
}

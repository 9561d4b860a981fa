// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for sensor capture loops
//!
//! A capture loop is a thread that repeatedly produces one tick until it is
//! told to stop. Loops can be paced to a frame interval so a producer
//! emits at the stream's frame rate instead of spinning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start_paced(
///     "sim-capture",
///     Duration::from_millis(33),
///     || Ok(SceneState::new()),
///     move |scene| {
///         let _ = sender.try_send(scene.next_pair());
///         LoopAction::Continue
///     },
/// );
///
/// // Later, stop the loop
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a loop with per-thread state and a fixed iteration interval
    ///
    /// `init_fn` runs once on the new thread. If it fails the thread exits
    /// without running `loop_fn`. Each iteration then sleeps for whatever
    /// remains of `interval`; an iteration that overruns is not made up. A
    /// zero interval runs iterations back to back.
    pub fn start_paced<S, I, F>(name: &str, interval: Duration, init_fn: I, mut loop_fn: F) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, interval = ?interval, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                    return;
                }
            };
            debug!(name = %thread_name, "Capture loop thread started");

            let mut iterations = 0u64;
            while !thread_stop.load(Ordering::SeqCst) {
                let started = Instant::now();

                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
                iterations += 1;

                let remaining = interval.saturating_sub(started.elapsed());
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }

            info!(name = %thread_name, iterations, "Capture loop thread exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// The iteration in progress completes before the thread exits.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending the stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

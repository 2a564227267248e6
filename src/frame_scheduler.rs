//! Frame scheduling and timing utilities.
//!
//! Provides portable frame pacing without async/await or platform timers.
//! The caller is responsible for sleeping/waiting between frames; one
//! tick is posted per frame period by the cooperative scheduler.

use embassy_time::{Duration, Instant};

use crate::controller::Controller;
use crate::{LedLayout, OutputDriver};

/// Target animation frame rate (30 FPS, ~33 ms per frame).
pub const DEFAULT_FPS: u32 = 30;

/// Default frame duration based on target FPS.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(1000 / DEFAULT_FPS as u64);

/// Result of a frame tick operation.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Portable frame scheduler that manages timing without async.
///
/// Tracks frame timing with drift correction, ticks the controller and
/// writes the composited frame to the output driver, and returns timing
/// info so the caller can sleep appropriately.
pub struct FrameScheduler<'a, O, L, const MAX_LEDS: usize, const MAX_SLOTS: usize = 20>
where
    O: OutputDriver,
    L: LedLayout,
{
    output: O,
    controller: Controller<'a, L, MAX_LEDS, MAX_SLOTS>,
    next_frame: Instant,
    frame_duration: Duration,
}

impl<'a, O, L, const MAX_LEDS: usize, const MAX_SLOTS: usize>
    FrameScheduler<'a, O, L, MAX_LEDS, MAX_SLOTS>
where
    O: OutputDriver,
    L: LedLayout,
{
    /// Create a new frame scheduler with the default frame duration.
    pub fn new(controller: Controller<'a, L, MAX_LEDS, MAX_SLOTS>, driver: O) -> Self {
        Self::with_frame_duration(controller, driver, DEFAULT_FRAME_DURATION)
    }

    /// Create a new frame scheduler with custom frame duration.
    pub fn with_frame_duration(
        controller: Controller<'a, L, MAX_LEDS, MAX_SLOTS>,
        driver: O,
        frame_duration: Duration,
    ) -> Self {
        Self {
            output: driver,
            controller,
            next_frame: Instant::from_millis(0),
            frame_duration,
        }
    }

    /// Process one frame and return timing information.
    ///
    /// Applies drift correction if we have fallen too far behind, ticks
    /// the controller, writes to the output driver, and returns the
    /// deadline for the next frame. The caller waits until
    /// `next_deadline` before calling `tick` again.
    pub fn tick(&mut self, now: Instant) -> FrameResult {
        // Drift correction: if we've fallen too far behind, reset to now.
        // This prevents catch-up bursts after long stalls (e.g. a flash
        // page rewrite pausing the engine).
        let max_drift = Duration::from_millis(self.frame_duration.as_millis() * 2);
        if now.as_millis() > self.next_frame.as_millis() + max_drift.as_millis() {
            self.next_frame = now;
        }

        let frame = self.controller.tick(now);
        self.output.write(frame);

        self.next_frame += self.frame_duration;

        let sleep_duration = if self.next_frame.as_millis() > now.as_millis() {
            Duration::from_millis(self.next_frame.as_millis() - now.as_millis())
        } else {
            Duration::from_millis(0)
        };

        FrameResult {
            next_deadline: self.next_frame,
            sleep_duration,
        }
    }

    /// Stop all playbacks and blank the physical output immediately.
    pub fn stop_all(&mut self) {
        self.controller.stop_all();
        let count = self.controller.led_count();
        self.output.write(&[crate::color::BLACK; MAX_LEDS][..count]);
    }

    /// Get a reference to the controller.
    pub fn controller(&self) -> &Controller<'a, L, MAX_LEDS, MAX_SLOTS> {
        &self.controller
    }

    /// Get a mutable reference to the controller.
    pub fn controller_mut(&mut self) -> &mut Controller<'a, L, MAX_LEDS, MAX_SLOTS> {
        &mut self.controller
    }
}

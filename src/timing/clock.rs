// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Frame clock for driving the transport from wall time.
//!
//! The song itself never reads a clock; hosts measure the time between
//! display frames with a [`FrameClock`] and pass the result to
//! `Song::tick`.

use std::time::{Duration, Instant};

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// Measures elapsed seconds between consecutive frames
#[derive(Debug, Clone)]
pub struct FrameClock {
    state: ClockState,
    /// Time of the previous frame
    last_frame: Option<Instant>,
    /// Frames measured since start
    frames: u64,
    /// Optional cap on a single frame's `dt`
    max_dt: Option<Duration>,
}

impl FrameClock {
    /// Create a stopped clock
    pub fn new() -> Self {
        Self {
            state: ClockState::Stopped,
            last_frame: None,
            frames: 0,
            max_dt: None,
        }
    }

    /// Create a clock with a custom cap on a single frame's `dt`
    pub fn with_max_dt(max_dt: Duration) -> Self {
        Self {
            max_dt: Some(max_dt),
            ..Self::new()
        }
    }

    /// Current state
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Frames measured since the last start
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Start measuring from `now`
    pub fn start_at(&mut self, now: Instant) {
        self.state = ClockState::Running;
        self.last_frame = Some(now);
        self.frames = 0;
    }

    /// Start measuring from the current instant
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Stop measuring
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.last_frame = None;
    }

    /// Seconds since the previous frame, as of `now`.
    ///
    /// Returns 0 while stopped and never goes negative.
    pub fn frame_at(&mut self, now: Instant) -> f64 {
        if self.state != ClockState::Running {
            return 0.0;
        }

        let elapsed = match self.last_frame {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);
        self.frames += 1;

        match self.max_dt {
            Some(max_dt) => elapsed.min(max_dt).as_secs_f64(),
            None => elapsed.as_secs_f64(),
        }
    }

    /// Seconds since the previous frame
    pub fn frame(&mut self) -> f64 {
        self.frame_at(Instant::now())
    }

    /// Duration of one frame at `frame_rate` frames per second
    pub fn frame_period(frame_rate: u32) -> Duration {
        Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing module.
//!
//! This module provides the wall-clock side of playback: measuring the
//! time between host frames.

pub mod clock;

pub use clock::{ClockState, FrameClock};

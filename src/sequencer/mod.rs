// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback core: event bus, transport and position arithmetic.
//!
//! This module provides:
//! - Typed song events and the synchronous listener bus
//! - The play/stop transport with per-frame note diffing
//! - Conversions between tempo, seconds and bar positions

pub mod events;
pub mod transport;

pub use events::{EventBus, EventKind, ListenerId, SongEvent};
pub use transport::{ActiveNote, Transport, TransportState};

use crate::error::SongError;

/// Beats in one bar; fixed for every song
pub const BEATS_PER_BAR: f64 = 8.0;

/// Tempo of a new song in BPM
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Position arithmetic for a given tempo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerTiming {
    /// Tempo in beats per minute
    pub tempo: f64,
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self { tempo: DEFAULT_TEMPO }
    }
}

impl SequencerTiming {
    /// Create timing with specified tempo
    pub fn with_tempo(tempo: f64) -> Self {
        Self { tempo }
    }

    /// Beats per second
    pub fn beats_per_second(&self) -> f64 {
        self.tempo / 60.0
    }

    /// Bars per second
    pub fn bars_per_second(&self) -> f64 {
        self.beats_per_second() / BEATS_PER_BAR
    }

    /// Seconds for one bar
    pub fn seconds_per_bar(&self) -> f64 {
        BEATS_PER_BAR / self.beats_per_second()
    }

    /// Distance in bars covered by `dt` seconds
    pub fn bars_for(&self, dt: f64) -> f64 {
        dt * self.bars_per_second()
    }

    /// Split a position into its bar and the beat offset inside that bar
    pub fn split(position: f64) -> (usize, f64) {
        let bar = position.floor();
        let beat = (position - bar) * BEATS_PER_BAR;
        (bar.max(0.0) as usize, beat)
    }
}

/// Accept any finite positive tempo
pub fn check_tempo(tempo: f64) -> Result<f64, SongError> {
    if tempo.is_finite() && tempo > 0.0 {
        Ok(tempo)
    } else {
        Err(SongError::InvalidTempo(tempo))
    }
}

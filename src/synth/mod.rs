// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Synthesizer front end.
//!
//! Turns song note events into start/end messages for a [`SynthBackend`].
//! The pitch contract between the transport and any backend is
//! [`key_to_frequency`]: twelve-tone equal temperament with key 69 at 440 Hz.

pub mod backend;

pub use backend::{LogBackend, RecordingBackend, SynthBackend};

use tracing::trace;

use crate::sequencer::SongEvent;

/// Volume used for song playback and auditions
pub const DEFAULT_VOLUME: f32 = 0.1;

/// Frequency in Hz of `key`
pub fn key_to_frequency(key: i32) -> f64 {
    440.0 * 2f64.powf((key - 69) as f64 / 12.0)
}

/// Message sent to a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthMessage {
    /// Start a voice for `key`
    Start { key: i32, freq: f64, volume: f32 },
    /// Release the voice for `key`
    End { key: i32 },
}

/// A timed audition started by [`Synthesizer::play_note`]
#[derive(Debug, Clone, Copy, PartialEq)]
struct Audition {
    key: i32,
    /// Backend time at which the note ends
    end: f64,
}

/// Maps song events and auditions onto backend messages
pub struct Synthesizer<B: SynthBackend> {
    backend: B,
    volume: f32,
    auditions: Vec<Audition>,
}

impl<B: SynthBackend> Synthesizer<B> {
    /// Create a synthesizer at the default volume
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            volume: DEFAULT_VOLUME,
            auditions: Vec::new(),
        }
    }

    /// Set the playback volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.set_volume(volume);
        self
    }

    /// Playback volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the playback volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() { DEFAULT_VOLUME } else { volume.clamp(0.0, 1.0) };
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Forward note events; other events are ignored
    pub fn handle_event(&mut self, event: &SongEvent) {
        match *event {
            SongEvent::NoteStart { key, .. } => self.begin_note(key, self.volume),
            SongEvent::NoteEnd { key, .. } => self.end_note(key),
            _ => {}
        }
    }

    /// Start a voice for `key`
    pub fn begin_note(&mut self, key: i32, volume: f32) {
        let freq = key_to_frequency(key);
        trace!(key, freq, "begin note");
        self.backend.send(SynthMessage::Start { key, freq, volume });
    }

    /// Release the voice for `key`
    pub fn end_note(&mut self, key: i32) {
        trace!(key, "end note");
        self.backend.send(SynthMessage::End { key });
    }

    /// Play `key` for `duration` seconds starting at `now`.
    ///
    /// The note is released by the first [`update`](Self::update) at or
    /// after `now + duration`.
    pub fn play_note(&mut self, key: i32, duration: f64, now: f64) {
        self.begin_note(key, self.volume);
        self.auditions.push(Audition {
            key,
            end: now + duration.max(0.0),
        });
    }

    /// Release auditions whose end time has passed; returns how many ended
    pub fn update(&mut self, now: f64) -> usize {
        let mut ended = 0;
        let mut index = 0;
        while index < self.auditions.len() {
            if now >= self.auditions[index].end {
                let audition = self.auditions.remove(index);
                self.end_note(audition.key);
                ended += 1;
            } else {
                index += 1;
            }
        }
        ended
    }

    /// Auditions still sounding
    pub fn pending_auditions(&self) -> usize {
        self.auditions.len()
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Play/stop transport with per-frame note diffing.
//!
//! Each frame the song computes the set of notes sounding at the playhead
//! and hands it to [`Transport::apply_frame`], which compares it with the
//! previous frame's set by note identity. Notes that appeared produce a
//! `NoteStart`, notes that vanished produce a `NoteEnd`, and notes present in
//! both frames are sustained silently. Editing a sounding note in place keeps
//! its identity, so it never restarts.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::events::SongEvent;
use super::{check_tempo, SequencerTiming, DEFAULT_TEMPO};
use crate::arrangement::NoteId;
use crate::error::SongError;

/// Transport state; there is no paused state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// A note that is currently sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveNote {
    /// Channel index
    pub channel: usize,
    /// Note identity within the channel
    pub note: NoteId,
    /// Key the note started with; its end is reported with the same key
    pub key: i32,
}

impl ActiveNote {
    fn identity(&self) -> (usize, NoteId) {
        (self.channel, self.note)
    }
}

/// Playhead, tempo and the set of sounding notes
#[derive(Debug, Clone)]
pub struct Transport {
    /// Playhead in bars
    position: f64,
    /// Tempo in BPM
    tempo: f64,
    state: TransportState,
    /// Notes sounding as of the last frame, in start order
    active: Vec<ActiveNote>,
    /// Wrap the playhead at the end of the song instead of stopping
    loop_playback: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// Create a stopped, looping transport at bar 0
    pub fn new() -> Self {
        Self {
            position: 0.0,
            tempo: DEFAULT_TEMPO,
            state: TransportState::Stopped,
            active: Vec::new(),
            loop_playback: true,
        }
    }

    /// Current state
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Whether the transport is running
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Playhead in bars
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Move the playhead; negative positions clamp to 0
    pub fn set_position(&mut self, position: f64) {
        self.position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    }

    /// Tempo in BPM
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Set the tempo; anything but a finite positive value is rejected
    pub fn set_tempo(&mut self, tempo: f64) -> Result<(), SongError> {
        self.tempo = check_tempo(tempo)?;
        Ok(())
    }

    /// Whether the playhead wraps at the end of the song
    pub fn loop_playback(&self) -> bool {
        self.loop_playback
    }

    /// Wrap at the end of the song, or stop there when disabled
    pub fn set_loop_playback(&mut self, enabled: bool) {
        self.loop_playback = enabled;
    }

    /// Timing at the current tempo
    pub fn timing(&self) -> SequencerTiming {
        SequencerTiming::with_tempo(self.tempo)
    }

    /// Notes sounding as of the last frame
    pub fn active_notes(&self) -> &[ActiveNote] {
        &self.active
    }

    /// Start playback; returns false if already playing
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            return false;
        }
        self.state = TransportState::Playing;
        self.active.clear();
        debug!(position = self.position, tempo = self.tempo, "transport playing");
        true
    }

    /// Stop playback and rewind to the start of the current bar.
    ///
    /// Returns a `NoteEnd` for every note that was sounding, or `None` if the
    /// transport was already stopped.
    pub fn stop(&mut self) -> Option<Vec<SongEvent>> {
        if !self.is_playing() {
            return None;
        }
        self.state = TransportState::Stopped;
        self.position = self.position.floor();

        let ends: Vec<SongEvent> = self
            .active
            .drain(..)
            .map(|note| SongEvent::NoteEnd {
                key: note.key,
                channel: note.channel,
            })
            .collect();

        debug!(position = self.position, flushed = ends.len(), "transport stopped");
        Some(ends)
    }

    /// Advance the playhead by `dt` seconds of playback.
    ///
    /// When looping the playhead wraps modulo `song_length`; otherwise it may
    /// land past the end, which [`Transport::finish`] then handles.
    pub fn advance(&mut self, dt: f64, song_length: usize) -> f64 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.position += self.timing().bars_for(dt);

        if self.loop_playback && song_length > 0 {
            self.position = self.position.rem_euclid(song_length as f64);
        }
        self.position
    }

    /// Stop at the end of a non-looping song.
    ///
    /// Once the playhead reaches `song_length` the transport stops, rewinds
    /// to bar 0 and returns the `NoteEnd`s of the flushed notes. Returns
    /// `None` while the song is still running.
    pub fn finish(&mut self, song_length: usize) -> Option<Vec<SongEvent>> {
        if self.loop_playback || self.position < song_length as f64 {
            return None;
        }
        let ends = self.stop()?;
        self.position = 0.0;
        debug!(song_length, "end of song");
        Some(ends)
    }

    /// Replace the sounding set with `current` and report the transitions.
    ///
    /// Ends are reported before starts so a backend keyed by pitch never
    /// cuts off a note that starts on the same key in the same frame.
    pub fn apply_frame(&mut self, current: Vec<ActiveNote>) -> Vec<SongEvent> {
        let current_ids: HashSet<(usize, NoteId)> =
            current.iter().map(ActiveNote::identity).collect();
        let previous_ids: HashSet<(usize, NoteId)> =
            self.active.iter().map(ActiveNote::identity).collect();

        let mut events = Vec::new();

        // Ended notes keep the key they were started with
        let mut kept = Vec::with_capacity(current.len());
        for note in self.active.drain(..) {
            if current_ids.contains(&note.identity()) {
                kept.push(note);
            } else {
                trace!(key = note.key, channel = note.channel, "note end");
                events.push(SongEvent::NoteEnd {
                    key: note.key,
                    channel: note.channel,
                });
            }
        }

        for note in current {
            if !previous_ids.contains(&note.identity()) {
                trace!(key = note.key, channel = note.channel, "note start");
                events.push(SongEvent::NoteStart {
                    key: note.key,
                    channel: note.channel,
                });
                kept.push(note);
            }
        }

        self.active = kept;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(count: usize) -> Vec<NoteId> {
        let mut arena: SlotMap<NoteId, ()> = SlotMap::with_key();
        (0..count).map(|_| arena.insert(())).collect()
    }

    fn active(channel: usize, note: NoteId, key: i32) -> ActiveNote {
        ActiveNote { channel, note, key }
    }

    #[test]
    fn test_play_stop_transitions() {
        let mut transport = Transport::new();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert!(transport.stop().is_none());

        assert!(transport.play());
        assert!(!transport.play());
        assert!(transport.is_playing());

        assert_eq!(transport.stop(), Some(Vec::new()));
        assert!(!transport.is_playing());
    }

    #[test]
    fn test_advance_converts_tempo() {
        let mut transport = Transport::new();
        // 120 BPM, 8 beats per bar: one bar every 4 seconds
        transport.advance(1.0, 16);
        assert!((transport.position() - 0.25).abs() < 1e-12);
        transport.advance(3.0, 16);
        assert!((transport.position() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_advance_ignores_negative_dt() {
        let mut transport = Transport::new();
        transport.advance(-1.0, 16);
        assert_eq!(transport.position(), 0.0);
        transport.advance(f64::NAN, 16);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_advance_loops_when_enabled() {
        let mut transport = Transport::new();
        transport.set_position(1.9);
        transport.set_loop_playback(true);
        transport.advance(0.8, 2); // +0.2 bars
        assert!((transport.position() - 0.1).abs() < 1e-9);

        transport.set_loop_playback(false);
        transport.set_position(1.9);
        transport.advance(0.8, 2);
        assert!((transport.position() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_set_tempo_rejects_invalid_values() {
        let mut transport = Transport::new();
        assert!(transport.set_tempo(10.0).is_ok());
        assert_eq!(transport.tempo(), 10.0);

        assert_eq!(transport.set_tempo(0.0), Err(SongError::InvalidTempo(0.0)));
        assert!(transport.set_tempo(f64::NAN).is_err());
        assert_eq!(transport.tempo(), 10.0);

        // 10 BPM: 1/48 bar per second
        transport.advance(1.0, 16);
        assert!((transport.position() - 1.0 / 48.0).abs() < 1e-12);
    }

    #[test]
    fn test_finish_stops_and_rewinds_at_end() {
        let notes = ids(1);
        let mut transport = Transport::new();
        transport.set_loop_playback(false);
        transport.play();
        transport.set_position(1.5);
        transport.apply_frame(vec![active(0, notes[0], 40)]);
        assert!(transport.finish(2).is_none());

        transport.advance(2.0, 2); // +0.5 bars reaches the end
        let ends = transport.finish(2).unwrap();
        assert_eq!(ends, vec![SongEvent::NoteEnd { key: 40, channel: 0 }]);
        assert!(!transport.is_playing());
        assert_eq!(transport.position(), 0.0);
        assert!(transport.active_notes().is_empty());
    }

    #[test]
    fn test_finish_ignored_when_looping() {
        let mut transport = Transport::new();
        assert!(transport.loop_playback());
        transport.play();
        transport.advance(9.0, 2);
        assert!(transport.finish(2).is_none());
        assert!(transport.is_playing());
    }

    #[test]
    fn test_stop_snaps_to_bar_and_flushes() {
        let notes = ids(2);
        let mut transport = Transport::new();
        transport.play();
        transport.set_position(3.7);
        transport.apply_frame(vec![active(0, notes[0], 40), active(1, notes[1], 52)]);

        let ends = transport.stop().unwrap();
        assert_eq!(
            ends,
            vec![
                SongEvent::NoteEnd { key: 40, channel: 0 },
                SongEvent::NoteEnd { key: 52, channel: 1 },
            ]
        );
        assert_eq!(transport.position(), 3.0);
        assert!(transport.active_notes().is_empty());
    }

    #[test]
    fn test_diff_start_sustain_end() {
        let notes = ids(1);
        let mut transport = Transport::new();
        transport.play();

        let events = transport.apply_frame(vec![active(0, notes[0], 40)]);
        assert_eq!(events, vec![SongEvent::NoteStart { key: 40, channel: 0 }]);

        for _ in 0..10 {
            assert!(transport.apply_frame(vec![active(0, notes[0], 40)]).is_empty());
        }

        let events = transport.apply_frame(Vec::new());
        assert_eq!(events, vec![SongEvent::NoteEnd { key: 40, channel: 0 }]);
        assert!(transport.apply_frame(Vec::new()).is_empty());
    }

    #[test]
    fn test_diff_reports_ends_before_starts() {
        let notes = ids(2);
        let mut transport = Transport::new();
        transport.play();
        transport.apply_frame(vec![active(0, notes[0], 40)]);

        let events = transport.apply_frame(vec![active(0, notes[1], 40)]);
        assert_eq!(
            events,
            vec![
                SongEvent::NoteEnd { key: 40, channel: 0 },
                SongEvent::NoteStart { key: 40, channel: 0 },
            ]
        );
    }

    #[test]
    fn test_diff_uses_identity_not_key() {
        let notes = ids(1);
        let mut transport = Transport::new();
        transport.play();
        transport.apply_frame(vec![active(0, notes[0], 40)]);

        // Same identity with an edited key stays sustained; the end keeps the original key
        assert!(transport.apply_frame(vec![active(0, notes[0], 41)]).is_empty());
        let events = transport.apply_frame(Vec::new());
        assert_eq!(events, vec![SongEvent::NoteEnd { key: 40, channel: 0 }]);
    }

    #[test]
    fn test_same_note_on_two_channels_is_distinct() {
        let notes = ids(1);
        let mut transport = Transport::new();
        transport.play();

        let events =
            transport.apply_frame(vec![active(0, notes[0], 40), active(1, notes[0], 40)]);
        assert_eq!(events.len(), 2);
        assert_eq!(transport.active_notes().len(), 2);
    }

    #[test]
    fn test_play_clears_previous_frame() {
        let notes = ids(1);
        let mut transport = Transport::new();
        transport.play();
        transport.apply_frame(vec![active(0, notes[0], 40)]);
        transport.stop();

        transport.play();
        let events = transport.apply_frame(vec![active(0, notes[0], 40)]);
        assert_eq!(events, vec![SongEvent::NoteStart { key: 40, channel: 0 }]);
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The song aggregate.
//!
//! A [`Song`] owns the channels, the selection cursor, the transport and the
//! event bus. Editors mutate it through its methods and then dispatch the
//! matching event themselves; the song never infers change events from
//! arrangement edits. The transport side dispatches its own note and
//! playhead events from [`Song::tick`] and [`Song::stop`].

use tracing::{debug, trace};

use super::channel::Channel;
use super::note::{Note, NoteId};
use crate::error::{Result, SongError};
use crate::sequencer::{
    ActiveNote, EventBus, EventKind, ListenerId, SequencerTiming, SongEvent, Transport,
    TransportState,
};

/// A complete arrangement plus its playback state
#[derive(Debug)]
pub struct Song {
    /// Channels, fixed at construction
    channels: Vec<Channel>,
    /// Nominal length in bars
    length: usize,
    /// Pattern pool size shared by every channel
    max_patterns: usize,
    /// Cursor channel
    selected_channel: usize,
    /// Cursor bar
    selected_bar: usize,
    /// Playhead, tempo and sounding notes
    transport: Transport,
    /// Listeners
    events: EventBus,
}

impl Default for Song {
    fn default() -> Self {
        Self::new(4, 16, 4)
    }
}

impl Song {
    /// Create a song; channel count and length are at least 1
    pub fn new(num_channels: usize, length: usize, max_patterns: usize) -> Self {
        let length = length.max(1);
        let channels = (0..num_channels.max(1))
            .map(|_| Channel::new(length, max_patterns))
            .collect();

        Self {
            channels,
            length,
            max_patterns,
            selected_channel: 0,
            selected_bar: 0,
            transport: Transport::default(),
            events: EventBus::new(),
        }
    }

    /// Builder: set tempo; fails unless the tempo is finite and positive
    pub fn with_tempo(mut self, tempo: f64) -> Result<Self> {
        self.transport.set_tempo(tempo)?;
        Ok(self)
    }

    /// Builder: wrap the playhead at the end of the song (the default) or stop there
    pub fn with_loop_playback(mut self, enabled: bool) -> Self {
        self.transport.set_loop_playback(enabled);
        self
    }

    // ---------------------------------------------------------------------
    // Arrangement
    // ---------------------------------------------------------------------

    /// All channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel by index
    pub fn channel(&self, channel: usize) -> Result<&Channel> {
        let count = self.channels.len();
        self.channels
            .get(channel)
            .ok_or(SongError::UnknownChannel { channel, count })
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut Channel> {
        let count = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(SongError::UnknownChannel { channel, count })
    }

    /// Nominal length in bars
    pub fn length(&self) -> usize {
        self.length
    }

    /// Set the nominal length.
    ///
    /// Channel sequences keep the length they were created with; only the
    /// nominal value and the cursor bound change.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.max(1);
        if self.selected_bar >= self.length {
            self.selected_bar = self.length - 1;
        }
    }

    /// Pattern pool size per channel
    pub fn max_patterns(&self) -> usize {
        self.max_patterns
    }

    /// Grow or shrink every channel's pattern pool to `size`.
    ///
    /// Shrinking fails, without changing anything, if a sequence slot still
    /// references a pattern that would be dropped. Truncated patterns lose
    /// their notes.
    pub fn set_max_patterns(&mut self, size: usize) -> Result<()> {
        if size < self.max_patterns {
            for (channel_index, channel) in self.channels.iter().enumerate() {
                if let Some((bar, &pattern)) = channel
                    .sequence()
                    .iter()
                    .enumerate()
                    .find(|&(_, &pattern)| pattern > size)
                {
                    return Err(SongError::PatternInUse {
                        channel: channel_index,
                        bar,
                        pattern,
                    });
                }
            }
        }

        for channel in &mut self.channels {
            channel.resize_pool(size);
        }
        self.max_patterns = size;

        for (channel_index, channel) in self.channels.iter().enumerate() {
            let actual = channel.patterns().len();
            if actual != size {
                return Err(SongError::PoolSizeMismatch {
                    channel: channel_index,
                    expected: size,
                    actual,
                });
            }
        }

        debug!(max_patterns = size, "pattern pool resized");
        Ok(())
    }

    /// Find a pattern to use on `channel`.
    ///
    /// Returns the 1-based index of the first empty pattern. If every pattern
    /// has notes, every channel's pool grows by one and the new last index is
    /// returned. The pattern is not placed in any slot.
    pub fn new_pattern(&mut self, channel: usize) -> Result<usize> {
        if let Some(index) = self.channel(channel)?.first_empty_pattern() {
            return Ok(index);
        }
        self.set_max_patterns(self.max_patterns + 1)?;
        Ok(self.max_patterns)
    }

    /// Pattern index placed at `bar` on `channel`
    pub fn pattern_index(&self, channel: usize, bar: usize) -> Result<usize> {
        let channel = self.channel(channel)?;
        channel.slot(bar).ok_or(SongError::BarOutOfRange {
            bar,
            length: channel.sequence().len(),
        })
    }

    /// Place pattern `index` (0 = none) at `bar` on `channel`
    pub fn set_pattern(&mut self, channel: usize, bar: usize, index: usize) -> Result<()> {
        if index > self.max_patterns {
            return Err(SongError::PatternOutOfRange {
                pattern: index,
                max: self.max_patterns,
            });
        }
        self.channel_mut(channel)?.set_slot(bar, index)?;
        trace!(channel, bar, pattern = index, "sequence slot set");
        Ok(())
    }

    /// Append a note to pattern `pattern` (1-based) of `channel`.
    ///
    /// No collision checks are made; editors fit placements beforehand.
    pub fn add_note(
        &mut self,
        channel: usize,
        pattern: usize,
        time: f64,
        key: i32,
        length: f64,
    ) -> Result<NoteId> {
        let note = Note::new(time, key, length)?;
        self.channel_mut(channel)?.add_note(pattern, note)
    }

    /// Remove a note from whichever pattern owns it
    pub fn remove_note(&mut self, channel: usize, note: NoteId) -> Result<Note> {
        self.channel_mut(channel)?
            .remove_note(note)
            .ok_or(SongError::UnknownNote { channel })
    }

    /// Look up a note
    pub fn note(&self, channel: usize, note: NoteId) -> Result<&Note> {
        self.channel(channel)?
            .note(note)
            .ok_or(SongError::UnknownNote { channel })
    }

    /// Look up a note for in-place editing; identity is preserved
    pub fn note_mut(&mut self, channel: usize, note: NoteId) -> Result<&mut Note> {
        self.channel_mut(channel)?
            .note_mut(note)
            .ok_or(SongError::UnknownNote { channel })
    }

    /// Notes sounding at `beat` of `bar`, across all channels.
    ///
    /// Channels whose slot is 0 or outside their sequence contribute nothing.
    pub fn notes_at(&self, bar: usize, beat: f64) -> Vec<ActiveNote> {
        let mut sounding = Vec::new();
        for (channel_index, channel) in self.channels.iter().enumerate() {
            let Some(index) = channel.slot(bar) else {
                continue;
            };
            for (id, note) in channel.pattern_notes(index) {
                if note.contains(beat) {
                    sounding.push(ActiveNote {
                        channel: channel_index,
                        note: id,
                        key: note.key,
                    });
                }
            }
        }
        sounding
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Cursor channel
    pub fn selected_channel(&self) -> usize {
        self.selected_channel
    }

    /// Cursor bar
    pub fn selected_bar(&self) -> usize {
        self.selected_bar
    }

    /// Move the cursor
    pub fn select(&mut self, channel: usize, bar: usize) -> Result<()> {
        if channel >= self.channels.len() {
            return Err(SongError::UnknownChannel {
                channel,
                count: self.channels.len(),
            });
        }
        if bar >= self.length {
            return Err(SongError::BarOutOfRange {
                bar,
                length: self.length,
            });
        }
        self.selected_channel = channel;
        self.selected_bar = bar;
        Ok(())
    }

    /// Pattern index at the cursor
    pub fn selected_pattern(&self) -> usize {
        self.pattern_index(self.selected_channel, self.selected_bar)
            .unwrap_or(0)
    }

    // ---------------------------------------------------------------------
    // Transport
    // ---------------------------------------------------------------------

    /// Playhead in bars
    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    /// Move the playhead; the next frame re-diffs against the new position
    pub fn set_position(&mut self, position: f64) {
        self.transport.set_position(position);
    }

    /// Tempo in BPM
    pub fn tempo(&self) -> f64 {
        self.transport.tempo()
    }

    /// Set the tempo; fails unless the tempo is finite and positive
    pub fn set_tempo(&mut self, tempo: f64) -> Result<()> {
        self.transport.set_tempo(tempo)
    }

    /// Whether the playhead wraps at the end of the song
    pub fn loop_playback(&self) -> bool {
        self.transport.loop_playback()
    }

    /// Enable or disable playhead wrapping; without it playback stops at the end
    pub fn set_loop_playback(&mut self, enabled: bool) {
        self.transport.set_loop_playback(enabled);
    }

    /// Whether the transport is running
    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Transport state
    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Notes sounding as of the last frame
    pub fn active_notes(&self) -> &[ActiveNote] {
        self.transport.active_notes()
    }

    /// Start playback; returns false if it was already playing
    pub fn play(&mut self) -> bool {
        self.transport.play()
    }

    /// Stop playback.
    ///
    /// Rewinds to the start of the current bar, dispatches a `NoteEnd` for
    /// every sounding note and then `PlayheadMoved`. No-op if stopped.
    pub fn stop(&mut self) {
        if let Some(ends) = self.transport.stop() {
            self.flush(&ends);
        }
    }

    /// Run one frame of playback, `dt` seconds after the previous one.
    ///
    /// Advances the playhead, diffs the sounding notes against the previous
    /// frame, dispatches the resulting note events and then `PlayheadMoved`.
    /// Without loop playback, reaching the end of the song stops playback
    /// and rewinds to bar 0 the way [`Song::stop`] does. Does nothing while
    /// stopped.
    pub fn tick(&mut self, dt: f64) {
        if !self.transport.is_playing() {
            return;
        }

        let position = self.transport.advance(dt, self.length);
        if let Some(ends) = self.transport.finish(self.length) {
            self.flush(&ends);
            return;
        }
        let (bar, beat) = SequencerTiming::split(position);
        let sounding = self.notes_at(bar, beat);
        let events = self.transport.apply_frame(sounding);

        if !events.is_empty() {
            trace!(bar, beat, changes = events.len(), "frame");
        }
        for event in &events {
            self.events.dispatch(event);
        }
        self.events.dispatch(&SongEvent::PlayheadMoved);
    }

    fn flush(&mut self, ends: &[SongEvent]) {
        for event in ends {
            self.events.dispatch(event);
        }
        self.events.dispatch(&SongEvent::PlayheadMoved);
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Register a listener for one kind of event
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        self.events.subscribe(kind, listener)
    }

    /// Register a listener by event name (`"noteStart"`, `"trackChanged"`, ...)
    pub fn add_event_listener<F>(&mut self, name: &str, listener: F) -> Result<ListenerId>
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        self.events.subscribe_named(name, listener)
    }

    /// Register a listener for every kind of event
    pub fn subscribe_all<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        self.events.subscribe_all(listener)
    }

    /// Remove a listener
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Deliver an event to its listeners synchronously
    pub fn dispatch(&mut self, event: SongEvent) {
        self.events.dispatch(&event);
    }
}

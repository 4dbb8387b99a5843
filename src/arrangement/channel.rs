// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Channels: a bar sequence plus a pool of patterns.

use slotmap::SlotMap;

use super::note::{Note, NoteId};
use super::pattern::Pattern;
use crate::error::{Result, SongError};

/// An independent voice with its own bar-to-pattern mapping
#[derive(Debug, Clone)]
pub struct Channel {
    /// Pattern index per bar; 0 = nothing, n = `patterns[n - 1]`
    sequence: Vec<usize>,
    /// Pattern pool
    patterns: Vec<Pattern>,
    /// Storage for every note of every pattern in this channel
    notes: SlotMap<NoteId, Note>,
}

impl Channel {
    /// Create a channel with an empty sequence and a pool of empty patterns
    pub fn new(song_length: usize, max_patterns: usize) -> Self {
        Self {
            sequence: vec![0; song_length],
            patterns: (0..max_patterns).map(|_| Pattern::new()).collect(),
            notes: SlotMap::with_key(),
        }
    }

    /// Pattern index placed at each bar
    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// Pattern index at `bar`, or `None` outside the sequence
    pub fn slot(&self, bar: usize) -> Option<usize> {
        self.sequence.get(bar).copied()
    }

    /// The pattern pool
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Pattern by 1-based index
    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        index.checked_sub(1).and_then(|i| self.patterns.get(i))
    }

    /// Look up a note
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    /// Look up a note for in-place editing
    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    /// Notes of a pattern in insertion order, with their ids
    pub fn pattern_notes(&self, index: usize) -> impl Iterator<Item = (NoteId, &Note)> + '_ {
        self.pattern(index)
            .into_iter()
            .flat_map(|p| p.notes().iter())
            .filter_map(move |&id| self.notes.get(id).map(|note| (id, note)))
    }

    /// Total notes stored in this channel
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// First empty pattern (1-based)
    pub fn first_empty_pattern(&self) -> Option<usize> {
        self.patterns.iter().position(Pattern::is_empty).map(|i| i + 1)
    }

    pub(crate) fn set_slot(&mut self, bar: usize, index: usize) -> Result<()> {
        let length = self.sequence.len();
        let slot = self
            .sequence
            .get_mut(bar)
            .ok_or(SongError::BarOutOfRange { bar, length })?;
        *slot = index;
        Ok(())
    }

    pub(crate) fn add_note(&mut self, index: usize, note: Note) -> Result<NoteId> {
        let max = self.patterns.len();
        let pattern = index
            .checked_sub(1)
            .and_then(|i| self.patterns.get_mut(i))
            .ok_or(SongError::PatternOutOfRange { pattern: index, max })?;
        let id = self.notes.insert(note);
        pattern.push(id);
        Ok(id)
    }

    pub(crate) fn remove_note(&mut self, id: NoteId) -> Option<Note> {
        let note = self.notes.remove(id)?;
        for pattern in &mut self.patterns {
            if pattern.remove(id) {
                break;
            }
        }
        Some(note)
    }

    /// Resize the pool, dropping the notes of any truncated patterns
    pub(crate) fn resize_pool(&mut self, size: usize) {
        if size < self.patterns.len() {
            for pattern in self.patterns.drain(size..) {
                for id in pattern.notes() {
                    self.notes.remove(*id);
                }
            }
        } else {
            self.patterns.resize_with(size, Pattern::new);
        }
    }
}

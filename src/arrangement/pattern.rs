// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Patterns: reusable blocks of notes placed on bars.

use super::note::NoteId;

/// A pattern in a channel's pool.
///
/// Holds the ids of its notes in insertion order; the notes themselves live
/// in the owning channel's note arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    notes: Vec<NoteId>,
}

impl Pattern {
    /// Create an empty pattern
    pub fn new() -> Self {
        Self { notes: Vec::new() }
    }

    /// Note ids in insertion order
    pub fn notes(&self) -> &[NoteId] {
        &self.notes
    }

    /// A pattern is empty iff it has no notes
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Number of notes
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether the pattern owns `id`
    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains(&id)
    }

    pub(crate) fn push(&mut self, id: NoteId) {
        self.notes.push(id);
    }

    pub(crate) fn remove(&mut self, id: NoteId) -> bool {
        if let Some(pos) = self.notes.iter().position(|&n| n == id) {
            self.notes.remove(pos);
            true
        } else {
            false
        }
    }
}

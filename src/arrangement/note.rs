// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Notes placed inside patterns.

use slotmap::new_key_type;

use crate::error::{Result, SongError};

new_key_type! {
    /// Stable identity of a note within its channel.
    ///
    /// Survives in-place edits of the note's fields and is never reused for a
    /// different note once the original has been removed.
    pub struct NoteId;
}

/// A note inside a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Offset in beats from the start of the pattern
    pub time: f64,
    /// Pitch index (69 = A4)
    pub key: i32,
    /// Duration in beats
    pub length: f64,
}

impl Note {
    /// Create a note, rejecting negative times and non-positive lengths
    pub fn new(time: f64, key: i32, length: f64) -> Result<Self> {
        if !time.is_finite() || time < 0.0 {
            return Err(SongError::InvalidNote(format!("time {} must be >= 0", time)));
        }
        if !length.is_finite() || length <= 0.0 {
            return Err(SongError::InvalidNote(format!("length {} must be > 0", length)));
        }
        Ok(Self { time, key, length })
    }

    /// Beat at which the note stops sounding (exclusive)
    pub fn end(&self) -> f64 {
        self.time + self.length
    }

    /// Whether the note sounds at `beat`, using the half-open `[time, end)` interval
    pub fn contains(&self, beat: f64) -> bool {
        beat >= self.time && beat < self.end()
    }
}

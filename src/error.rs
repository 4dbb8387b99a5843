// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for arrangement and transport operations.

use thiserror::Error;

/// Errors raised by song, editor and event bus operations.
///
/// Every operation validates its arguments before touching any state, so an
/// `Err` always means nothing was mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SongError {
    /// Listener registered under a name that is not a known event
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Channel index outside the song
    #[error("channel {channel} out of range (song has {count} channels)")]
    UnknownChannel { channel: usize, count: usize },

    /// Bar index outside a channel's sequence
    #[error("bar {bar} out of range (sequence has {length} bars)")]
    BarOutOfRange { bar: usize, length: usize },

    /// Pattern index outside `[0, max_patterns]`
    #[error("pattern {pattern} out of range (max patterns {max})")]
    PatternOutOfRange { pattern: usize, max: usize },

    /// Shrinking the pattern pool would drop a pattern still placed in a sequence
    #[error("pattern {pattern} is still placed on channel {channel} at bar {bar}")]
    PatternInUse {
        channel: usize,
        bar: usize,
        pattern: usize,
    },

    /// A channel's pool does not have the size the song records
    #[error("channel {channel} has {actual} patterns, expected {expected}")]
    PoolSizeMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    /// Note id does not belong to the channel
    #[error("note not found on channel {channel}")]
    UnknownNote { channel: usize },

    /// Note fields violate `time >= 0` or `length > 0`
    #[error("invalid note: {0}")]
    InvalidNote(String),

    /// Tempo that is not a finite positive BPM value
    #[error("invalid tempo: {0} BPM")]
    InvalidTempo(f64),
}

/// Result alias for song operations
pub type Result<T> = std::result::Result<T, SongError>;

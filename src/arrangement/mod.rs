// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song data model.
//!
//! This module provides:
//! - Notes: pitched events with a start and a length in beats
//! - Patterns: reusable blocks of notes
//! - Channels: bar sequences referencing a pool of patterns
//! - Song: the aggregate owning channels, selection, transport and events

pub mod channel;
pub mod note;
pub mod pattern;
pub mod song;

pub use channel::Channel;
pub use note::{Note, NoteId};
pub use pattern::Pattern;
pub use song::Song;

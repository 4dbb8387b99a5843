// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Editor models.
//!
//! These hold the interaction state of the two editing surfaces and apply
//! their commands to a [`Song`](crate::arrangement::Song). Rendering is left
//! to the host.

pub mod pattern;
pub mod track;

pub use pattern::{fit_note, PatternEditor, Press, Release, MIN_NOTE_LENGTH};
pub use track::{CellState, GridCell, TrackCommand, TrackEditor};

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Step-sequencer tracker core.
//!
//! A [`Song`] holds channels of bar sequences that point into per-channel
//! pools of note patterns. Playback is driven by calling [`Song::tick`] once
//! per frame; the transport diffs the sounding notes by identity and
//! dispatches `NoteStart`/`NoteEnd` events to listeners, which a
//! [`Synthesizer`](synth::Synthesizer) turns into voice messages.

pub mod arrangement;
pub mod config;
pub mod editing;
pub mod engine;
pub mod error;
pub mod sequencer;
pub mod synth;
pub mod timing;

pub use arrangement::{Channel, Note, NoteId, Pattern, Song};
pub use config::EngineConfig;
pub use editing::{PatternEditor, TrackCommand, TrackEditor};
pub use engine::{Engine, EngineError, EngineHandle};
pub use error::{Result, SongError};
pub use sequencer::{ActiveNote, EventKind, ListenerId, SongEvent, TransportState, BEATS_PER_BAR};
pub use synth::{key_to_frequency, SynthMessage, Synthesizer};

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Synthesizer backends.
//!
//! A backend receives the start/end messages a [`Synthesizer`](super::Synthesizer)
//! produces. Sound generation lives behind this trait.

use std::sync::{Arc, Mutex};

use tracing::info;

use super::SynthMessage;

/// Receiver of synthesizer messages
pub trait SynthBackend: Send {
    /// Deliver one message
    fn send(&mut self, message: SynthMessage);
}

/// Backend that logs every message
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

impl SynthBackend for LogBackend {
    fn send(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::Start { key, freq, volume } => {
                info!(key, freq, volume, "note start");
            }
            SynthMessage::End { key } => info!(key, "note end"),
        }
    }
}

/// Backend that collects messages for inspection.
///
/// Clones share the same buffer, so a clone kept by the caller sees what the
/// synthesizer sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    messages: Arc<Mutex<Vec<SynthMessage>>>,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far
    pub fn messages(&self) -> Vec<SynthMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Forget received messages
    pub fn clear(&self) {
        match self.messages.lock() {
            Ok(mut messages) => messages.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl SynthBackend for RecordingBackend {
    fn send(&mut self, message: SynthMessage) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

impl<B: SynthBackend + ?Sized> SynthBackend for Box<B> {
    fn send(&mut self, message: SynthMessage) {
        (**self).send(message);
    }
}

// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song events and the synchronous listener bus.
//!
//! Listeners are invoked in registration order on the dispatching thread,
//! before `dispatch` returns. Nothing is queued. A listener that panics
//! unwinds through `dispatch`, so listeners registered after it do not see
//! that event. It stays registered and is called again on the next one.

use std::fmt;
use std::str::FromStr;

use crate::error::SongError;

/// Something that happened to the song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SongEvent {
    /// Selection cursor moved
    SelectionChanged,
    /// A sequence slot or the pattern placed at it changed
    TrackChanged { channel: usize, bar: usize },
    /// Playhead advanced, or was rewound by a stop
    PlayheadMoved,
    /// A note began sounding
    NoteStart { key: i32, channel: usize },
    /// A note stopped sounding
    NoteEnd { key: i32, channel: usize },
}

impl SongEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            SongEvent::SelectionChanged => EventKind::SelectionChanged,
            SongEvent::TrackChanged { .. } => EventKind::TrackChanged,
            SongEvent::PlayheadMoved => EventKind::PlayheadMoved,
            SongEvent::NoteStart { .. } => EventKind::NoteStart,
            SongEvent::NoteEnd { .. } => EventKind::NoteEnd,
        }
    }
}

/// Event kinds a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectionChanged,
    TrackChanged,
    PlayheadMoved,
    NoteStart,
    NoteEnd,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [EventKind; 5] = [
        EventKind::SelectionChanged,
        EventKind::TrackChanged,
        EventKind::PlayheadMoved,
        EventKind::NoteStart,
        EventKind::NoteEnd,
    ];

    /// Name used by hosts that subscribe by string
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::SelectionChanged => "selectionChanged",
            EventKind::TrackChanged => "trackChanged",
            EventKind::PlayheadMoved => "playheadMoved",
            EventKind::NoteStart => "noteStart",
            EventKind::NoteEnd => "noteEnd",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = SongError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SongError::UnknownEvent(s.to_string()))
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SongEvent) + Send>;

/// Typed observer list
#[derive(Default)]
pub struct EventBus {
    /// Registrations with their kind filter; `None` receives every kind
    listeners: Vec<(ListenerId, Option<EventKind>, Listener)>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one kind of event
    pub fn subscribe<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        self.register(Some(kind), Box::new(listener))
    }

    /// Register a listener by event name; unknown names are rejected
    pub fn subscribe_named<F>(&mut self, name: &str, listener: F) -> Result<ListenerId, SongError>
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        let kind = name.parse::<EventKind>()?;
        Ok(self.subscribe(kind, listener))
    }

    /// Register one listener for every kind of event
    pub fn subscribe_all<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&SongEvent) + Send + 'static,
    {
        self.register(None, Box::new(listener))
    }

    fn register(&mut self, filter: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, filter, listener));
        id
    }

    /// Remove a listener; returns whether anything was removed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to its listeners, in registration order
    pub fn dispatch(&mut self, event: &SongEvent) {
        let kind = event.kind();
        for (_, filter, listener) in self.listeners.iter_mut() {
            if filter.map_or(true, |wanted| wanted == kind) {
                listener(event);
            }
        }
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

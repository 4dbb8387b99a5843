// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback engine task.
//!
//! The engine moves a [`Song`] onto a tokio task and drives it from a frame
//! interval. Other tasks talk to it through a clonable [`EngineHandle`], and
//! every event the song dispatches is forwarded to the receiver returned by
//! [`Engine::spawn`]. The song is only ever touched by the engine task, so
//! listeners and edits never race with a frame.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::arrangement::Song;
use crate::config::EngineConfig;
use crate::error::SongError;
use crate::sequencer::{ActiveNote, SongEvent, TransportState};
use crate::timing::FrameClock;

/// Commands buffered before senders wait
const COMMAND_CAPACITY: usize = 64;

/// Longest `dt` a single self-timed frame may advance by
const MAX_FRAME_DT: Duration = Duration::from_millis(250);

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine task is gone
    #[error("engine is not running")]
    Closed,

    #[error(transparent)]
    Song(#[from] SongError),
}

type EditFn = Box<dyn FnOnce(&mut Song) + Send>;

/// Acknowledges that a command has fully run, events included
type Ack = oneshot::Sender<()>;

enum Command {
    Play(Ack),
    Stop(Ack),
    Tick(f64, Ack),
    Edit(EditFn),
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Shutdown(oneshot::Sender<Song>),
}

/// Playback state at one moment
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub state: TransportState,
    /// Playhead in bars
    pub position: f64,
    pub tempo: f64,
    pub active_notes: Vec<ActiveNote>,
    pub selected_channel: usize,
    pub selected_bar: usize,
}

impl EngineSnapshot {
    fn of(song: &Song) -> Self {
        Self {
            state: song.transport_state(),
            position: song.position(),
            tempo: song.tempo(),
            active_notes: song.active_notes().to_vec(),
            selected_channel: song.selected_channel(),
            selected_bar: song.selected_bar(),
        }
    }
}

/// Receiver of every event the song dispatches
pub type EventReceiver = mpsc::UnboundedReceiver<SongEvent>;

/// Spawns engine tasks
pub struct Engine;

impl Engine {
    /// Move `song` onto a new task.
    ///
    /// The task ticks the song `config.frame_rate` times per second while it
    /// is playing; a frame rate of 0 leaves ticking to [`EngineHandle::tick`].
    /// Must be called from within a tokio runtime.
    pub fn spawn(mut song: Song, config: &EngineConfig) -> (EngineHandle, EventReceiver) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        song.subscribe_all(move |event| {
            // The receiver may have been dropped; events are then discarded
            let _ = event_tx.send(*event);
        });

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        tokio::spawn(run(song, command_rx, config.frame_rate));

        (EngineHandle { commands: command_tx }, event_rx)
    }
}

/// Clonable handle to a running engine
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Play(_) => f.write_str("Play"),
            Command::Stop(_) => f.write_str("Stop"),
            Command::Tick(dt, _) => write!(f, "Tick({})", dt),
            Command::Edit(_) => f.write_str("Edit"),
            Command::Snapshot(_) => f.write_str("Snapshot"),
            Command::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

impl EngineHandle {
    /// Start playback
    pub async fn play(&self) -> Result<(), EngineError> {
        self.request(Command::Play).await
    }

    /// Stop playback.
    ///
    /// Returns once every sounding note's `NoteEnd` has been dispatched and
    /// forwarded to the event receiver.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.request(Command::Stop).await
    }

    /// Run one frame `dt` seconds after the previous one; returns after the
    /// frame's events have been forwarded
    pub async fn tick(&self, dt: f64) -> Result<(), EngineError> {
        self.request(|ack| Command::Tick(dt, ack)).await
    }

    /// Run `edit` against the song on the engine task and return its result
    pub async fn edit<F, T>(&self, edit: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Song) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: EditFn = Box::new(move |song| {
            let _ = reply_tx.send(edit(song));
        });
        self.send(Command::Edit(job)).await?;
        reply_rx.await.map_err(|_| EngineError::Closed)
    }

    /// Run a fallible song edit, flattening its error
    pub async fn try_edit<F, T>(&self, edit: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Song) -> Result<T, SongError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.edit(edit).await??)
    }

    /// Current playback state
    pub async fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| EngineError::Closed)
    }

    /// Stop playback, end the task and take the song back
    pub async fn shutdown(&self) -> Result<Song, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Shutdown(reply_tx)).await?;
        reply_rx.await.map_err(|_| EngineError::Closed)
    }

    async fn request<F>(&self, command: F) -> Result<(), EngineError>
    where
        F: FnOnce(Ack) -> Command,
    {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(command(ack_tx)).await?;
        ack_rx.await.map_err(|_| EngineError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }
}

/// Frame clock for self-timed frames; a stalled task resumes with one capped step
fn engine_clock() -> FrameClock {
    FrameClock::with_max_dt(MAX_FRAME_DT)
}

async fn run(mut song: Song, mut commands: mpsc::Receiver<Command>, frame_rate: u32) {
    let mut clock = engine_clock();
    let mut interval = (frame_rate > 0).then(|| {
        let mut interval = time::interval(FrameClock::frame_period(frame_rate));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });
    debug!(frame_rate, "engine started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all engine handles dropped");
                    break;
                };
                trace!(?command, "engine command");
                match command {
                    Command::Play(ack) => {
                        if song.play() {
                            clock.start();
                        }
                        let _ = ack.send(());
                    }
                    Command::Stop(ack) => {
                        song.stop();
                        clock.stop();
                        let _ = ack.send(());
                    }
                    Command::Tick(dt, ack) => {
                        song.tick(dt);
                        let _ = ack.send(());
                    }
                    Command::Edit(edit) => edit(&mut song),
                    Command::Snapshot(reply) => {
                        let _ = reply.send(EngineSnapshot::of(&song));
                    }
                    Command::Shutdown(reply) => {
                        song.stop();
                        debug!("engine shut down");
                        let _ = reply.send(song);
                        return;
                    }
                }
            }
            _ = next_frame(&mut interval), if song.is_playing() => {
                let dt = clock.frame();
                song.tick(dt);
                if !song.is_playing() {
                    // Playback ran off the end of the song
                    clock.stop();
                }
            }
        }
    }
}

async fn next_frame(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn manual_config() -> EngineConfig {
        EngineConfig {
            frame_rate: 0,
            ..EngineConfig::default()
        }
    }

    fn song_with_note() -> Song {
        let mut song = Song::new(2, 4, 2);
        song.add_note(0, 1, 0.0, 40, 2.0).unwrap();
        song.set_pattern(0, 0, 1).unwrap();
        song
    }

    fn drain(events: &mut EventReceiver) -> Vec<SongEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_manual_ticks_forward_events() {
        let (engine, mut events) = Engine::spawn(song_with_note(), &manual_config());

        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        let snapshot = engine.snapshot().await.unwrap();

        assert_eq!(snapshot.state, TransportState::Playing);
        assert_eq!(snapshot.active_notes.len(), 1);
        assert_eq!(
            drain(&mut events),
            vec![
                SongEvent::NoteStart { key: 40, channel: 0 },
                SongEvent::PlayheadMoved
            ]
        );
    }

    #[tokio::test]
    async fn test_edit_returns_value() {
        let (engine, _events) = Engine::spawn(Song::new(1, 4, 2), &manual_config());

        let index = engine.try_edit(|song| song.new_pattern(0)).await.unwrap();
        assert_eq!(index, 1);

        let length = engine.edit(|song| song.length()).await.unwrap();
        assert_eq!(length, 4);
    }

    #[tokio::test]
    async fn test_edit_error_is_surfaced() {
        let (engine, _events) = Engine::spawn(Song::new(1, 4, 2), &manual_config());

        let result = engine.try_edit(|song| song.set_pattern(0, 0, 9)).await;
        assert!(matches!(
            result,
            Err(EngineError::Song(SongError::PatternOutOfRange { pattern: 9, max: 2 }))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_flushes_and_returns_song() {
        let (engine, mut events) = Engine::spawn(song_with_note(), &manual_config());
        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        drain(&mut events);

        let song = engine.shutdown().await.unwrap();
        assert!(!song.is_playing());
        assert_eq!(
            drain(&mut events),
            vec![
                SongEvent::NoteEnd { key: 40, channel: 0 },
                SongEvent::PlayheadMoved
            ]
        );

        assert!(matches!(engine.play().await, Err(EngineError::Closed)));
    }

    #[tokio::test]
    async fn test_stop_returns_after_note_ends_are_forwarded() {
        let (engine, mut events) = Engine::spawn(song_with_note(), &manual_config());
        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        assert_eq!(drain(&mut events).len(), 2);

        engine.stop().await.unwrap();
        assert_eq!(
            drain(&mut events),
            vec![
                SongEvent::NoteEnd { key: 40, channel: 0 },
                SongEvent::PlayheadMoved
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_play_keeps_sounding_notes() {
        let (engine, mut events) = Engine::spawn(song_with_note(), &manual_config());
        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        drain(&mut events);

        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        let snapshot = engine.snapshot().await.unwrap();
        assert_eq!(snapshot.active_notes.len(), 1);
        assert_eq!(drain(&mut events), vec![SongEvent::PlayheadMoved]);
    }

    #[tokio::test]
    async fn test_engine_stops_at_song_end() {
        let mut song = Song::new(1, 1, 1).with_loop_playback(false);
        song.add_note(0, 1, 0.0, 40, 8.0).unwrap();
        song.set_pattern(0, 0, 1).unwrap();
        let (engine, mut events) = Engine::spawn(song, &manual_config());

        engine.play().await.unwrap();
        engine.tick(0.1).await.unwrap();
        // One bar is 4 s at 120 BPM
        engine.tick(4.0).await.unwrap();

        let snapshot = engine.snapshot().await.unwrap();
        assert_eq!(snapshot.state, TransportState::Stopped);
        assert_eq!(snapshot.position, 0.0);
        assert_eq!(
            drain(&mut events),
            vec![
                SongEvent::NoteStart { key: 40, channel: 0 },
                SongEvent::PlayheadMoved,
                SongEvent::NoteEnd { key: 40, channel: 0 },
                SongEvent::PlayheadMoved
            ]
        );
    }

    #[test]
    fn test_engine_clock_caps_stalled_frames() {
        let start = Instant::now();
        let mut clock = engine_clock();
        clock.start_at(start);
        let dt = clock.frame_at(start + Duration::from_secs(3));
        assert!((dt - MAX_FRAME_DT.as_secs_f64()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_frame_interval_advances_playhead() {
        let config = EngineConfig {
            frame_rate: 200,
            ..EngineConfig::default()
        };
        let (engine, _events) = Engine::spawn(song_with_note(), &config);

        engine.play().await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let snapshot = engine.snapshot().await.unwrap();
        assert!(snapshot.position > 0.0);

        engine.stop().await.unwrap();
        let stopped = engine.snapshot().await.unwrap();
        assert_eq!(stopped.state, TransportState::Stopped);
        assert_eq!(stopped.position, 0.0);
    }

    #[tokio::test]
    async fn test_stopped_engine_does_not_tick() {
        let config = EngineConfig {
            frame_rate: 200,
            ..EngineConfig::default()
        };
        let (engine, mut events) = Engine::spawn(song_with_note(), &config);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(engine.snapshot().await.unwrap().position, 0.0);
        assert!(drain(&mut events).is_empty());
    }
}

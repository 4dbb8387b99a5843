// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Piano roll editing of the pattern at the selection cursor.
//!
//! The roll spans one bar (8 beats). A press either grabs the note under
//! the pointer or creates a one-snap note, and the following drags resize it
//! from its left edge. Notes on the same key never overlap: placements are
//! fitted around existing notes and resizes stop at their neighbours.

use tracing::{debug, trace};

use crate::arrangement::{NoteId, Song};
use crate::error::Result;
use crate::sequencer::{SongEvent, BEATS_PER_BAR};

/// Shortest note the editor will create or leave behind, in beats
pub const MIN_NOTE_LENGTH: f64 = 1.0 / 16.0;

const EPSILON: f64 = 1e-9;

/// Fit a note of `length` beats starting at `time` between `occupied`
/// intervals (`(start, end)` pairs of notes on the same key).
///
/// A start inside an occupied interval is pushed to that interval's end,
/// repeatedly, and the end is clamped to the next occupied start and to the
/// end of the bar. Returns `(time, length)`, or `None` if less than
/// `min_length` remains.
pub fn fit_note(
    occupied: &[(f64, f64)],
    time: f64,
    length: f64,
    min_length: f64,
) -> Option<(f64, f64)> {
    let mut start = time.max(0.0);
    while let Some(&(_, end)) = occupied
        .iter()
        .find(|&&(s, e)| s <= start + EPSILON && start < e - EPSILON)
    {
        start = end;
    }

    let next = occupied
        .iter()
        .map(|&(s, _)| s)
        .filter(|&s| s > start + EPSILON)
        .fold(BEATS_PER_BAR, f64::min);
    let fitted = length.min(next - start);

    if fitted + EPSILON < min_length || fitted <= 0.0 {
        return None;
    }
    Some((start, fitted))
}

/// Result of a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    /// Note being edited
    pub note: NoteId,
    /// Key to audition
    pub key: i32,
    /// Whether the press created the note
    pub created: bool,
}

/// Result of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// A new note was placed
    Placed(NoteId),
    /// An existing note changed size
    Resized(NoteId),
    /// An existing note was grabbed and let go
    Unchanged(NoteId),
    /// A click without movement: the note created by the press was removed
    Auditioned { key: i32 },
}

#[derive(Debug, Clone, Copy)]
struct NoteDrag {
    channel: usize,
    bar: usize,
    pattern: usize,
    note: NoteId,
    key: i32,
    /// Fixed edge of the resize
    anchor: f64,
    /// Geometry at press time
    initial: (f64, f64),
    created: bool,
}

/// Editor state for the piano roll
#[derive(Debug, Clone)]
pub struct PatternEditor {
    /// Grid increment in beats
    snap: f64,
    drag: Option<NoteDrag>,
}

impl Default for PatternEditor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PatternEditor {
    /// Create an editor snapping to `snap` beats
    pub fn new(snap: f64) -> Self {
        Self {
            snap: sanitize_snap(snap),
            drag: None,
        }
    }

    /// Grid increment in beats
    pub fn snap(&self) -> f64 {
        self.snap
    }

    /// Change the grid increment
    pub fn set_snap(&mut self, snap: f64) {
        self.snap = sanitize_snap(snap);
    }

    /// Whether a note is being edited
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Press at `beat` on `key` in the pattern at the cursor.
    ///
    /// Returns `None` when the press is off the roll, no pattern is placed at
    /// the cursor, or no room is left for a new note.
    pub fn press(&mut self, song: &mut Song, beat: f64, key: i32) -> Result<Option<Press>> {
        self.drag = None;
        if !(0.0..BEATS_PER_BAR).contains(&beat) {
            return Ok(None);
        }

        let channel = song.selected_channel();
        let bar = song.selected_bar();
        let pattern = song.selected_pattern();
        if pattern == 0 {
            debug!(channel, bar, "no pattern at cursor");
            return Ok(None);
        }

        let hit = song
            .channel(channel)?
            .pattern_notes(pattern)
            .find(|(_, note)| note.key == key && note.contains(beat))
            .map(|(id, note)| (id, note.clone()));

        if let Some((id, note)) = hit {
            self.drag = Some(NoteDrag {
                channel,
                bar,
                pattern,
                note: id,
                key,
                anchor: note.time,
                initial: (note.time, note.length),
                created: false,
            });
            return Ok(Some(Press {
                note: id,
                key,
                created: false,
            }));
        }

        let occupied = occupied(song, channel, pattern, key, None)?;
        let Some((time, length)) =
            fit_note(&occupied, self.snap_down(beat), self.snap, MIN_NOTE_LENGTH)
        else {
            debug!(beat, key, "no room for a note");
            return Ok(None);
        };

        let id = song.add_note(channel, pattern, time, key, length)?;
        trace!(channel, pattern, time, key, length, "note created");
        song.dispatch(SongEvent::TrackChanged { channel, bar });

        self.drag = Some(NoteDrag {
            channel,
            bar,
            pattern,
            note: id,
            key,
            anchor: time,
            initial: (time, length),
            created: true,
        });
        Ok(Some(Press {
            note: id,
            key,
            created: true,
        }))
    }

    /// Resize the pressed note so it spans the anchor cell and the cell
    /// under `beat`. Dragging left of the anchor flips the note to extend
    /// leftwards. Returns whether the note changed.
    pub fn drag(&mut self, song: &mut Song, beat: f64) -> Result<bool> {
        let Some(drag) = self.drag else {
            return Ok(false);
        };
        if !beat.is_finite() {
            return Ok(false);
        }

        let cell = self.snap_down(beat.clamp(0.0, BEATS_PER_BAR - EPSILON));
        let (start, end) = if cell + EPSILON >= drag.anchor {
            (drag.anchor, cell + self.snap)
        } else {
            (cell, drag.anchor + self.snap)
        };

        let others = occupied(song, drag.channel, drag.pattern, drag.key, Some(drag.note))?;
        let lower = others
            .iter()
            .map(|&(_, e)| e)
            .filter(|&e| e <= drag.anchor + EPSILON)
            .fold(0.0, f64::max);
        let upper = others
            .iter()
            .map(|&(s, _)| s)
            .filter(|&s| s > drag.anchor + EPSILON)
            .fold(BEATS_PER_BAR, f64::min);

        let start = start.max(lower);
        let end = end.min(upper);
        if end - start + EPSILON < MIN_NOTE_LENGTH {
            return Ok(false);
        }

        let note = song.note_mut(drag.channel, drag.note)?;
        if same(note.time, start) && same(note.length, end - start) {
            return Ok(false);
        }
        note.time = start;
        note.length = end - start;
        trace!(channel = drag.channel, time = start, length = end - start, "note resized");
        song.dispatch(SongEvent::TrackChanged {
            channel: drag.channel,
            bar: drag.bar,
        });
        Ok(true)
    }

    /// Finish the edit.
    ///
    /// A note created by the press and never moved is removed again, so a
    /// plain click only auditions the key.
    pub fn release(&mut self, song: &mut Song) -> Result<Option<Release>> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        // The note may have been removed by another edit mid-drag
        let Ok(note) = song.note(drag.channel, drag.note) else {
            return Ok(None);
        };
        let moved = !same(note.time, drag.initial.0) || !same(note.length, drag.initial.1);

        let release = match (drag.created, moved) {
            (true, false) => {
                song.remove_note(drag.channel, drag.note)?;
                song.dispatch(SongEvent::TrackChanged {
                    channel: drag.channel,
                    bar: drag.bar,
                });
                Release::Auditioned { key: drag.key }
            }
            (true, true) => Release::Placed(drag.note),
            (false, true) => Release::Resized(drag.note),
            (false, false) => Release::Unchanged(drag.note),
        };
        Ok(Some(release))
    }

    fn snap_down(&self, beat: f64) -> f64 {
        // Nudge so beats sitting on a grid line do not fall into the cell below
        ((beat + EPSILON) / self.snap).floor() * self.snap
    }
}

fn sanitize_snap(snap: f64) -> f64 {
    if snap.is_finite() && snap > 0.0 {
        snap.min(BEATS_PER_BAR)
    } else {
        1.0
    }
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Intervals of the notes on `key` in a pattern, optionally skipping one note
fn occupied(
    song: &Song,
    channel: usize,
    pattern: usize,
    key: i32,
    except: Option<NoteId>,
) -> Result<Vec<(f64, f64)>> {
    Ok(song
        .channel(channel)?
        .pattern_notes(pattern)
        .filter(|(id, note)| note.key == key && Some(*id) != except)
        .map(|(_, note)| (note.time, note.end()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn song_with_pattern() -> Song {
        let mut song = Song::new(1, 4, 2);
        song.set_pattern(0, 0, 1).unwrap();
        song
    }

    fn geometry(song: &Song, id: NoteId) -> (f64, f64) {
        let note = song.note(0, id).unwrap();
        (note.time, note.length)
    }

    #[test]
    fn test_fit_pushes_past_collision() {
        assert_eq!(fit_note(&[(0.0, 2.0)], 1.5, 1.0, 0.25), Some((2.0, 1.0)));
    }

    #[test]
    fn test_fit_pushes_through_chain() {
        let occupied = [(0.0, 2.0), (2.0, 3.0)];
        assert_eq!(fit_note(&occupied, 1.0, 1.0, 0.25), Some((3.0, 1.0)));
    }

    #[test]
    fn test_fit_clamps_to_next_note() {
        assert_eq!(fit_note(&[(3.0, 4.0)], 2.5, 1.0, 0.25), Some((2.5, 0.5)));
    }

    #[test]
    fn test_fit_clamps_to_bar_end() {
        assert_eq!(fit_note(&[], 7.5, 1.0, 0.25), Some((7.5, 0.5)));
    }

    #[test]
    fn test_fit_rejects_full_roll() {
        assert_eq!(fit_note(&[(0.0, 8.0)], 3.0, 1.0, 0.25), None);
        assert_eq!(fit_note(&[(2.0, 3.0)], 1.95, 1.0, 0.25), None);
    }

    #[test]
    fn test_press_without_pattern_is_ignored() {
        let mut song = Song::new(1, 4, 2);
        let mut editor = PatternEditor::new(1.0);
        assert_eq!(editor.press(&mut song, 1.0, 60).unwrap(), None);
        assert!(!editor.is_dragging());
    }

    #[test]
    fn test_press_off_roll_is_ignored() {
        let mut song = song_with_pattern();
        let mut editor = PatternEditor::new(1.0);
        assert_eq!(editor.press(&mut song, 8.0, 60).unwrap(), None);
        assert_eq!(editor.press(&mut song, -0.5, 60).unwrap(), None);
    }

    #[test]
    fn test_click_auditions_without_placing() {
        let mut song = song_with_pattern();
        let mut editor = PatternEditor::new(1.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        song.subscribe_all(move |event| sink.lock().unwrap().push(*event));

        let press = editor.press(&mut song, 2.3, 60).unwrap().unwrap();
        assert!(press.created);
        assert_eq!(press.key, 60);
        assert_eq!(geometry(&song, press.note), (2.0, 1.0));

        let release = editor.release(&mut song).unwrap();
        assert_eq!(release, Some(Release::Auditioned { key: 60 }));
        assert_eq!(song.channel(0).unwrap().note_count(), 0);
        assert_eq!(
            *log.lock().unwrap(),
            vec![SongEvent::TrackChanged { channel: 0, bar: 0 }; 2]
        );
    }

    #[test]
    fn test_drag_places_note() {
        let mut song = song_with_pattern();
        let mut editor = PatternEditor::new(1.0);

        let press = editor.press(&mut song, 1.0, 60).unwrap().unwrap();
        assert!(editor.drag(&mut song, 3.5).unwrap());
        assert_eq!(geometry(&song, press.note), (1.0, 3.0));

        let release = editor.release(&mut song).unwrap();
        assert_eq!(release, Some(Release::Placed(press.note)));
        assert_eq!(song.channel(0).unwrap().note_count(), 1);
    }

    #[test]
    fn test_drag_left_of_anchor_flips() {
        let mut song = song_with_pattern();
        let mut editor = PatternEditor::new(1.0);

        let press = editor.press(&mut song, 4.0, 60).unwrap().unwrap();
        editor.drag(&mut song, 1.2).unwrap();
        assert_eq!(geometry(&song, press.note), (1.0, 4.0));

        // Back over the anchor restores a one-cell note
        editor.drag(&mut song, 4.5).unwrap();
        assert_eq!(geometry(&song, press.note), (4.0, 1.0));
    }

    #[test]
    fn test_drag_stops_at_neighbours() {
        let mut song = song_with_pattern();
        song.add_note(0, 1, 5.0, 60, 1.0).unwrap();
        song.add_note(0, 1, 0.0, 60, 1.0).unwrap();
        // Other keys do not block
        song.add_note(0, 1, 3.0, 61, 1.0).unwrap();
        let mut editor = PatternEditor::new(1.0);

        let press = editor.press(&mut song, 2.0, 60).unwrap().unwrap();
        editor.drag(&mut song, 7.5).unwrap();
        assert_eq!(geometry(&song, press.note), (2.0, 3.0));

        editor.drag(&mut song, 0.0).unwrap();
        assert_eq!(geometry(&song, press.note), (1.0, 2.0));
    }

    #[test]
    fn test_press_existing_note_resizes_it() {
        let mut song = song_with_pattern();
        let id = song.add_note(0, 1, 0.0, 60, 4.0).unwrap();
        let mut editor = PatternEditor::new(1.0);

        let press = editor.press(&mut song, 2.5, 60).unwrap().unwrap();
        assert_eq!(press, Press { note: id, key: 60, created: false });

        editor.drag(&mut song, 1.5).unwrap();
        assert_eq!(geometry(&song, id), (0.0, 2.0));
        assert_eq!(editor.release(&mut song).unwrap(), Some(Release::Resized(id)));
    }

    #[test]
    fn test_grab_without_movement_keeps_note() {
        let mut song = song_with_pattern();
        let id = song.add_note(0, 1, 0.0, 60, 2.0).unwrap();
        let mut editor = PatternEditor::new(1.0);

        editor.press(&mut song, 0.5, 60).unwrap();
        assert_eq!(editor.release(&mut song).unwrap(), Some(Release::Unchanged(id)));
        assert!(song.note(0, id).is_ok());
    }

    #[test]
    fn test_new_note_fits_after_collision() {
        let mut song = song_with_pattern();
        song.add_note(0, 1, 0.0, 10, 2.0).unwrap();
        let mut editor = PatternEditor::new(0.5);

        // Pressing inside the existing note grabs it instead of creating one
        let press = editor.press(&mut song, 1.5, 10).unwrap().unwrap();
        assert!(!press.created);
        editor.release(&mut song).unwrap();

        let press = editor.press(&mut song, 2.0, 10).unwrap().unwrap();
        assert!(press.created);
        assert_eq!(geometry(&song, press.note), (2.0, 0.5));
    }

    #[test]
    fn test_snap_is_sanitized() {
        assert_eq!(PatternEditor::new(0.0).snap(), 1.0);
        assert_eq!(PatternEditor::new(f64::NAN).snap(), 1.0);
        assert_eq!(PatternEditor::new(16.0).snap(), BEATS_PER_BAR);
    }

    #[test]
    fn test_release_without_press() {
        let mut song = song_with_pattern();
        let mut editor = PatternEditor::default();
        assert_eq!(editor.release(&mut song).unwrap(), None);
        assert!(!editor.drag(&mut song, 2.0).unwrap());
    }
}

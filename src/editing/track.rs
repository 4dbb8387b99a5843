// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequence grid editing: cursor movement and pattern placement.
//!
//! The grid has one row per channel and one column per bar. Every command
//! applies its change to the song and then dispatches `SelectionChanged` or
//! `TrackChanged` so renderers can redraw.

use tracing::{debug, warn};

use crate::arrangement::Song;
use crate::error::Result;
use crate::sequencer::SongEvent;

/// A cell of the sequence grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub channel: usize,
    pub bar: usize,
}

/// How a renderer should draw a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// No pattern placed
    Empty,
    /// A pattern is placed but has no notes
    Unused(usize),
    /// A pattern with notes is placed
    Filled(usize),
    /// The cursor is on this cell
    Selected(usize),
}

/// Commands from the sequence grid's key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackCommand {
    /// Next bar, wrapping to the first
    Right,
    /// Previous bar, wrapping to the last
    Left,
    /// Next channel, wrapping to the first
    Down,
    /// Previous channel, wrapping to the last
    Up,
    /// Type one digit of a pattern number into the selected slot
    Digit(u8),
    /// Next pattern number, wrapping past `max_patterns` to 0
    Increment,
    /// Previous pattern number, wrapping below 0 to `max_patterns`
    Decrement,
    /// Place an unused pattern in the selected slot
    NewPattern,
}

/// Editor state for the sequence grid
#[derive(Debug, Clone, Default)]
pub struct TrackEditor {
    /// Bar the cursor returns to when moving between channels
    cursor_bar: usize,
    /// Digits typed so far
    type_buffer: String,
    /// Cell under the pointer, if the pointer is over the grid
    hover: Option<GridCell>,
}

impl TrackEditor {
    /// Create an editor with the cursor at the song's selection
    pub fn new(song: &Song) -> Self {
        Self {
            cursor_bar: song.selected_bar(),
            type_buffer: String::new(),
            hover: None,
        }
    }

    /// Digits typed so far
    pub fn type_buffer(&self) -> &str {
        &self.type_buffer
    }

    /// Cell under the pointer
    pub fn hovered(&self) -> Option<GridCell> {
        self.hover
    }

    /// Apply a key command
    pub fn apply(&mut self, song: &mut Song, command: TrackCommand) -> Result<()> {
        match command {
            TrackCommand::Right => {
                let bar = (song.selected_bar() + 1) % song.length();
                self.move_cursor(song, song.selected_channel(), bar, true)
            }
            TrackCommand::Left => {
                let bar = song
                    .selected_bar()
                    .checked_sub(1)
                    .unwrap_or(song.length() - 1);
                self.move_cursor(song, song.selected_channel(), bar, true)
            }
            TrackCommand::Down => {
                let channel = (song.selected_channel() + 1) % song.channels().len();
                let bar = self.cursor_bar.min(song.length() - 1);
                self.move_cursor(song, channel, bar, false)
            }
            TrackCommand::Up => {
                let channel = song
                    .selected_channel()
                    .checked_sub(1)
                    .unwrap_or(song.channels().len() - 1);
                let bar = self.cursor_bar.min(song.length() - 1);
                self.move_cursor(song, channel, bar, false)
            }
            TrackCommand::Digit(digit) => self.type_digit(song, digit),
            TrackCommand::Increment => {
                let current = song.selected_pattern();
                let next = if current >= song.max_patterns() { 0 } else { current + 1 };
                self.place(song, next)
            }
            TrackCommand::Decrement => {
                let current = song.selected_pattern();
                let next = current.checked_sub(1).unwrap_or(song.max_patterns());
                self.place(song, next)
            }
            TrackCommand::NewPattern => {
                let index = song.new_pattern(song.selected_channel())?;
                self.place(song, index)
            }
        }
    }

    /// Track the pointer; positions outside the grid clear the hover
    pub fn hover(&mut self, song: &Song, grid_x: i64, grid_y: i64) -> Option<GridCell> {
        let bar = usize::try_from(grid_x).ok().filter(|&bar| bar < song.length());
        let channel = usize::try_from(grid_y)
            .ok()
            .filter(|&channel| channel < song.channels().len());
        self.hover = match (channel, bar) {
            (Some(channel), Some(bar)) => Some(GridCell { channel, bar }),
            _ => None,
        };
        self.hover
    }

    /// Select the hovered cell; does nothing when the pointer is off the grid
    pub fn click(&mut self, song: &mut Song) -> Result<Option<GridCell>> {
        let Some(cell) = self.hover else {
            return Ok(None);
        };
        self.move_cursor(song, cell.channel, cell.bar, true)?;
        Ok(Some(cell))
    }

    /// Display state of a cell, or `None` outside the grid
    pub fn cell_state(song: &Song, channel: usize, bar: usize) -> Option<CellState> {
        if bar >= song.length() {
            return None;
        }
        let channel_ref = song.channels().get(channel)?;
        let index = channel_ref.slot(bar).unwrap_or(0);

        if channel == song.selected_channel() && bar == song.selected_bar() {
            return Some(CellState::Selected(index));
        }
        Some(match channel_ref.pattern(index) {
            None => CellState::Empty,
            Some(pattern) if pattern.is_empty() => CellState::Unused(index),
            Some(_) => CellState::Filled(index),
        })
    }

    fn move_cursor(
        &mut self,
        song: &mut Song,
        channel: usize,
        bar: usize,
        remember_bar: bool,
    ) -> Result<()> {
        song.select(channel, bar)?;
        if remember_bar {
            self.cursor_bar = bar;
        }
        self.type_buffer.clear();
        song.dispatch(SongEvent::SelectionChanged);
        Ok(())
    }

    fn type_digit(&mut self, song: &mut Song, digit: u8) -> Result<()> {
        if digit > 9 {
            return Ok(());
        }
        let max = song.max_patterns();
        let digit = char::from(b'0' + digit);

        self.type_buffer.push(digit);
        if buffer_value(&self.type_buffer) > max {
            // Too large: start a new number with this digit
            self.type_buffer.clear();
            self.type_buffer.push(digit);
            if buffer_value(&self.type_buffer) > max {
                debug!(digit = %digit, max, "digit exceeds pattern pool");
                return Ok(());
            }
        }

        let index = buffer_value(&self.type_buffer);
        self.place(song, index)
    }

    fn place(&mut self, song: &mut Song, index: usize) -> Result<()> {
        let channel = song.selected_channel();
        let bar = song.selected_bar();
        if let Err(err) = song.set_pattern(channel, bar, index) {
            warn!(%err, channel, bar, "pattern placement rejected");
            return Err(err);
        }
        song.dispatch(SongEvent::TrackChanged { channel, bar });
        Ok(())
    }
}

fn buffer_value(buffer: &str) -> usize {
    // Saturate on absurdly long input so it always compares as too large
    buffer.parse().unwrap_or(usize::MAX)
}

#![cfg_attr(not(test), no_std)]

// The ordered list of songs found on storage, plus the UI cursor over
// it. Populated once at startup from the directory listing and
// read-only afterwards; the cursor wraps at both ends.

use heapless::{String, Vec};

pub struct Playlist<const MAX_SONGS: usize, const NAME_LEN: usize> {
    songs: Vec<String<NAME_LEN>, MAX_SONGS>,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistError {
    Full,
    NameTooLong,
}

impl<const MAX_SONGS: usize, const NAME_LEN: usize> Playlist<MAX_SONGS, NAME_LEN> {
    pub fn new() -> Self {
        Playlist {
            songs: Vec::new(),
            cursor: 0,
        }
    }

    /// Add one song during startup population.
    pub fn push(&mut self, name: &str) -> Result<(), PlaylistError> {
        let mut song: String<NAME_LEN> = String::new();
        song.push_str(name).map_err(|_| PlaylistError::NameTooLong)?;
        self.songs.push(song).map_err(|_| PlaylistError::Full)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The song under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.songs.get(self.cursor).map(|s| s.as_str())
    }

    /// Move the cursor one entry down, wrapping past the last entry.
    pub fn scroll_down(&mut self) {
        if self.songs.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.songs.len();
    }

    /// Move the cursor one entry up, wrapping past the first entry.
    pub fn scroll_up(&mut self) {
        if self.songs.is_empty() {
            return;
        }
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.songs.len() - 1);
    }

    /// The entries visible on a display with `rows` rows, chosen so
    /// that the cursor is always inside the window. Yields
    /// `(index, name)` pairs.
    pub fn window(&self, rows: usize) -> impl Iterator<Item = (usize, &str)> {
        let start = if rows == 0 {
            0
        } else {
            (self.cursor / rows) * rows
        };
        self.songs
            .iter()
            .enumerate()
            .skip(start)
            .take(rows)
            .map(|(i, s)| (i, s.as_str()))
    }
}

impl<const MAX_SONGS: usize, const NAME_LEN: usize> Default for Playlist<MAX_SONGS, NAME_LEN> {
    fn default() -> Self {
        Self::new()
    }
}

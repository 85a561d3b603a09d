#![cfg_attr(not(test), no_std)]

// Parser for the 128-byte trailer tag carried at the end of every song
// file (read from `file_size - 128`). Layout:
//
//   offset 0   tag marker (3 bytes)
//   offset 3   title      (27 bytes)
//   offset 30  artist     (30 bytes)
//   offset 60  album      (30 bytes)
//   offset 90  year       (4 bytes)
//   offset 127 comment    (1 byte)
//
// The remaining bytes are reserved. Text fields are padded with NUL or
// spaces and may contain stray non-printable bytes; those are dropped.

use heapless::String;

/// Length of the trailer record at the end of a song file.
pub const TRAILER_LEN: usize = 128;

const TAG: core::ops::Range<usize> = 0..3;
const TITLE: core::ops::Range<usize> = 3..30;
const ARTIST: core::ops::Range<usize> = 30..60;
const ALBUM: core::ops::Range<usize> = 60..90;
const YEAR: core::ops::Range<usize> = 90..94;
const COMMENT: usize = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerTag {
    pub tag: String<3>,
    pub title: String<27>,
    pub artist: String<30>,
    pub album: String<30>,
    pub year: String<4>,
    pub comment: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    /// Fewer than `TRAILER_LEN` bytes were supplied.
    Truncated,
}

impl TrailerTag {
    pub fn parse(raw: &[u8]) -> Result<TrailerTag, TagError> {
        if raw.len() < TRAILER_LEN {
            return Err(TagError::Truncated);
        }

        Ok(TrailerTag {
            tag: field(&raw[TAG]),
            title: field(&raw[TITLE]),
            artist: field(&raw[ARTIST]),
            album: field(&raw[ALBUM]),
            year: field(&raw[YEAR]),
            comment: raw[COMMENT],
        })
    }
}

/// Copy the printable ASCII content of a fixed-width field, dropping
/// padding and stray control bytes.
fn field<const N: usize>(bytes: &[u8]) -> String<N> {
    let mut s: String<N> = String::new();
    for &b in bytes {
        if (0x20..0x7F).contains(&b) {
            // Capacity matches the field width, push cannot fail
            let _ = s.push(b as char);
        }
    }
    while s.ends_with(' ') {
        s.pop();
    }
    s
}

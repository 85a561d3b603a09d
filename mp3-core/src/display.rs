//! Seam to the character display.
//!
//! The screen is addressed as 8 text rows. The firmware implements
//! [`Surface`] over the OLED; UI tests use a recording double.

/// Text rows available on the display.
pub const ROWS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
}

pub trait Surface {
    type Error: core::fmt::Debug;

    /// Write `text` starting at the left edge of `row`, overwriting
    /// what was there. Text past the right edge is clipped.
    async fn print(&mut self, text: &str, row: u8) -> Result<(), Self::Error>;

    async fn erase_row(&mut self, row: u8) -> Result<(), Self::Error>;

    async fn erase_all(&mut self) -> Result<(), Self::Error>;

    /// Shift the whole frame one column sideways.
    async fn scroll(&mut self, direction: ScrollDirection) -> Result<(), Self::Error>;
}

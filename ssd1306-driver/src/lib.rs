#![cfg_attr(not(test), no_std)]

//! Driver for an SSD1306 OLED in page addressing mode, 128x64, one
//! text row per page with an 8-pixel-wide 5x7 font. Implements the
//! player's [`Surface`] seam.
//!
//! Command sequences follow the SSD1306 datasheet (section 4.4 for
//! power up, the Addressing Setting and Scrolling command tables for
//! the rest). Chip select is owned by the `SpiDevice`; the D/C pin is
//! driven here.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiDevice;

use mp3_core::display::{ScrollDirection, Surface, ROWS};

const WIDTH: usize = 128;
const CHAR_WIDTH: usize = 8;

const BLANK_ROW: [u8; WIDTH] = [0; WIDTH];

const INIT_SEQUENCE: [u8; 25] = [
    0xAE, // display off
    0xD5, 0x80, // clock divide ratio / oscillator frequency
    0xA8, 0x3F, // multiplex ratio
    0xD3, 0x00, // display offset
    0x40, // display start line
    0x8D, 0x14, // charge pump on
    0xA1, // segment re-map
    0xC8, // COM output scan direction
    0xDA, 0x12, // COM pins hardware configuration
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge period
    0xDB, 0x40, // VCOMH deselect level
    0x20, 0x02, // page addressing mode
    0xA4, // follow RAM content
    0xA6, // normal (non-inverted) display
    0xAF, // display on
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OledError {
    Spi,
    Pin,
}

pub struct Oled<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> Oled<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    pub fn new(spi: SPI, dc: DC) -> Self {
        Oled { spi, dc }
    }

    /// Power-up initialisation followed by a RAM clear, so the panel
    /// does not show the random pixels it wakes up with.
    pub async fn begin(&mut self) -> Result<(), OledError> {
        self.command(&INIT_SEQUENCE).await?;
        self.erase_all().await
    }

    /// After deactivating scrolling the RAM content must be rewritten.
    pub async fn stop_scroll(&mut self) -> Result<(), OledError> {
        self.command(&[0x2E]).await
    }

    // Destroys the driver and releases the peripherals
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    async fn command(&mut self, bytes: &[u8]) -> Result<(), OledError> {
        self.dc.set_low().map_err(|_| OledError::Pin)?;
        self.spi.write(bytes).await.map_err(|_| OledError::Spi)
    }

    async fn data(&mut self, bytes: &[u8]) -> Result<(), OledError> {
        self.dc.set_high().map_err(|_| OledError::Pin)?;
        self.spi.write(bytes).await.map_err(|_| OledError::Spi)
    }

    /// Page start plus column pointer reset to the left edge.
    async fn set_row(&mut self, row: u8) -> Result<(), OledError> {
        self.command(&[0xB0 | (row & 0x07), 0x10, 0x00]).await
    }
}

impl<SPI, DC> Surface for Oled<SPI, DC>
where
    SPI: SpiDevice,
    DC: OutputPin,
{
    type Error = OledError;

    async fn print(&mut self, text: &str, row: u8) -> Result<(), Self::Error> {
        self.set_row(row).await?;

        let mut cell = [0u8; CHAR_WIDTH];
        let mut column = 0;
        for ch in text.chars().take(WIDTH / CHAR_WIDTH) {
            cell[..5].copy_from_slice(glyph(ch));
            self.data(&cell).await?;
            column += CHAR_WIDTH;
        }

        // Blank out to the right edge so the previous row content
        // cannot show through short text
        if column < WIDTH {
            self.data(&BLANK_ROW[..WIDTH - column]).await?;
        }
        Ok(())
    }

    async fn erase_row(&mut self, row: u8) -> Result<(), Self::Error> {
        self.set_row(row).await?;
        self.data(&BLANK_ROW).await
    }

    async fn erase_all(&mut self) -> Result<(), Self::Error> {
        for row in 0..ROWS {
            self.erase_row(row).await?;
        }
        Ok(())
    }

    async fn scroll(&mut self, direction: ScrollDirection) -> Result<(), Self::Error> {
        let setup = match direction {
            ScrollDirection::Left => 0x27,
            ScrollDirection::Right => 0x26,
        };
        // All pages, one scroll step per 5 frames, then activate
        self.command(&[setup, 0x00, 0x00, 0x07, 0x07, 0x00, 0xFF, 0x2F])
            .await
    }
}

fn glyph(ch: char) -> &'static [u8; 5] {
    let index = (ch as usize).wrapping_sub(0x20);
    FONT.get(index).unwrap_or(&FONT[(b'?' - 0x20) as usize])
}

// 5x7 font, column major, LSB at the top. Printable ASCII 0x20..0x7F.
#[rustfmt::skip]
const FONT: [[u8; 5]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // '#'
    [0x24, 0x2A, 0x6B, 0x2A, 0x12], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62], // '%'
    [0x36, 0x49, 0x55, 0x22, 0x50], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00], // ')'
    [0x14, 0x08, 0x3E, 0x08, 0x14], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08], // '+'
    [0x00, 0xA0, 0x60, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46], // '2'
    [0x22, 0x41, 0x49, 0x49, 0x36], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00], // ';'
    [0x08, 0x14, 0x22, 0x41, 0x00], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14], // '='
    [0x41, 0x22, 0x14, 0x08, 0x00], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E], // '@'
    [0x7E, 0x09, 0x09, 0x09, 0x7E], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22], // 'C'
    [0x7F, 0x41, 0x41, 0x41, 0x3E], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41], // 'E'
    [0x7F, 0x09, 0x09, 0x09, 0x01], // 'F'
    [0x3E, 0x41, 0x49, 0x49, 0x3A], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // 'H'
    [0x41, 0x41, 0x7F, 0x41, 0x41], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40], // 'L'
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // 'M'
    [0x7F, 0x02, 0x04, 0x08, 0x7F], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46], // 'R'
    [0x26, 0x49, 0x49, 0x49, 0x32], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // 'V'
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63], // 'X'
    [0x07, 0x08, 0x70, 0x08, 0x07], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43], // 'Z'
    [0x00, 0x7F, 0x41, 0x41, 0x00], // '['
    [0x02, 0x04, 0x08, 0x16, 0x32], // '\\'
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04], // '^'
    [0x80, 0x80, 0x80, 0x80, 0x80], // '_'
    [0x00, 0x01, 0x02, 0x04, 0x00], // '`'
    [0x20, 0x54, 0x54, 0x54, 0x78], // 'a'
    [0x7F, 0x44, 0x44, 0x44, 0x38], // 'b'
    [0x38, 0x44, 0x44, 0x44, 0x44], // 'c'
    [0x38, 0x44, 0x44, 0x44, 0x7F], // 'd'
    [0x38, 0x54, 0x54, 0x54, 0x18], // 'e'
    [0x08, 0x7E, 0x09, 0x01, 0x02], // 'f'
    [0x18, 0xA4, 0xA4, 0xA4, 0x7C], // 'g'
    [0x7F, 0x08, 0x04, 0x04, 0x78], // 'h'
    [0x00, 0x44, 0x7D, 0x40, 0x00], // 'i'
    [0x40, 0x80, 0x80, 0x84, 0x7D], // 'j'
    [0x7F, 0x10, 0x28, 0x44, 0x00], // 'k'
    [0x00, 0x41, 0x7F, 0x40, 0x00], // 'l'
    [0x7C, 0x04, 0x18, 0x04, 0x78], // 'm'
    [0x7C, 0x08, 0x04, 0x04, 0x78], // 'n'
    [0x38, 0x44, 0x44, 0x44, 0x38], // 'o'
    [0xFC, 0x24, 0x24, 0x24, 0x18], // 'p'
    [0x18, 0x24, 0x24, 0x28, 0xFC], // 'q'
    [0x7C, 0x08, 0x04, 0x04, 0x08], // 'r'
    [0x48, 0x54, 0x54, 0x54, 0x20], // 's'
    [0x04, 0x3E, 0x44, 0x40, 0x20], // 't'
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // 'u'
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // 'v'
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // 'w'
    [0x44, 0x28, 0x10, 0x28, 0x44], // 'x'
    [0x9C, 0xA0, 0xA0, 0xA0, 0x7C], // 'y'
    [0x44, 0x64, 0x54, 0x4C, 0x44], // 'z'
    [0x00, 0x08, 0x36, 0x41, 0x00], // '{'
    [0x00, 0x00, 0x7F, 0x00, 0x00], // '|'
    [0x00, 0x41, 0x36, 0x08, 0x00], // '}'
    [0x08, 0x04, 0x04, 0x08, 0x04], // '~'
    [0x00, 0x00, 0x00, 0x00, 0x00],
];

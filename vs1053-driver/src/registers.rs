use core::ops::BitOr;

/// SCI register map of the VS1053b (data sheet section 9.6).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Mode = 0x00,
    Status = 0x01,
    Bass = 0x02,
    Clockf = 0x03,
    DecodeTime = 0x04,
    AuData = 0x05,
    Wram = 0x06,
    WramAddr = 0x07,
    Hdat0 = 0x08,
    Hdat1 = 0x09,
    AiAddr = 0x0A,
    Volume = 0x0B,
}

impl From<Register> for u8 {
    fn from(register: Register) -> u8 {
        register as u8
    }
}

/// Bits of the SCI MODE register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mode(u16);

impl Mode {
    /// Soft reset
    pub const RESET: Mode = Mode(0x0004);
    /// Cancel decoding the current stream
    pub const CANCEL: Mode = Mode(0x0008);
    /// Stream mode
    pub const STREAM: Mode = Mode(0x0040);
    /// VS1002-native SPI mode, required for SDI operation
    pub const SDI_NEW: Mode = Mode(0x0800);

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

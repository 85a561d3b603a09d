//! Playback state shared between the control layer and the UI.

/// One of five discrete loudness steps.
///
/// Each step maps to a value for the decoder's volume register
/// (attenuation per channel; 0x00 is loudest, 0xFE near-mute).
/// `up`/`down` clamp at the ends rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VolumeLevel(u8);

const ATTENUATION: [u16; VolumeLevel::STEPS] = [0xFEFE, 0x4B4B, 0x3535, 0x2525, 0x0101];

impl VolumeLevel {
    pub const STEPS: usize = 5;

    pub const MIN: VolumeLevel = VolumeLevel(0);
    pub const MAX: VolumeLevel = VolumeLevel((Self::STEPS - 1) as u8);

    pub fn up(self) -> VolumeLevel {
        VolumeLevel((self.0 + 1).min(Self::MAX.0))
    }

    pub fn down(self) -> VolumeLevel {
        VolumeLevel(self.0.saturating_sub(1))
    }

    /// Step index, 0 (quietest) to 4 (loudest).
    pub fn step(self) -> u8 {
        self.0
    }

    /// The value to write to the decoder's volume register.
    pub fn attenuation(self) -> u16 {
        ATTENUATION[self.0 as usize]
    }
}

impl Default for VolumeLevel {
    fn default() -> Self {
        VolumeLevel(3)
    }
}

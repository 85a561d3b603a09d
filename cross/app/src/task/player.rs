use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch;

use mp3_core::pipeline::{AudioSink, BlockQueue, Player, WATCH_CONSUMERS};
use vs1053_driver::DriverError;

use crate::SharedCodec;

/// The decoder seam for the player: each byte locks the shared codec
/// driver and feeds the data port. The lock is also what keeps the
/// control task's register writes from landing mid-transfer.
pub struct CodecSink {
    codec: &'static SharedCodec,
}

impl CodecSink {
    pub fn new(codec: &'static SharedCodec) -> Self {
        CodecSink { codec }
    }
}

impl AudioSink for CodecSink {
    type Error = DriverError;

    async fn send_byte(&mut self, byte: u8) -> Result<(), DriverError> {
        let mut driver_unlocked = self.codec.lock().await;
        match driver_unlocked.as_mut() {
            Some(driver) => driver.send_data_byte(byte).await,
            None => Ok(()),
        }
    }
}

/// The consumer task: drains the block queue into the decoder.
#[embassy_executor::task]
pub async fn player(
    blocks: &'static BlockQueue<CriticalSectionRawMutex>,
    paused: watch::Receiver<'static, CriticalSectionRawMutex, bool, WATCH_CONSUMERS>,
    codec: &'static SharedCodec,
) {
    Player::new(blocks, paused, CodecSink::new(codec))
        .run()
        .await
}

//! The VS1053 driver takes an `embedded_hal_async::delay::DelayNs` for
//! its reset timing. This is not natively available in Embassy so this
//! struct bridges `embassy-time` to the embedded-hal trait.

use embassy_time::{Duration, Timer};
use embedded_hal_async::delay::DelayNs;

pub struct AsyncDelay;

impl AsyncDelay {
    pub fn new() -> Self {
        AsyncDelay
    }
}

impl DelayNs for AsyncDelay {
    async fn delay_ns(&mut self, ns: u32) {
        let ms = ns / 1_000_000;
        Timer::after(Duration::from_millis(ms as u64)).await;
    }
}

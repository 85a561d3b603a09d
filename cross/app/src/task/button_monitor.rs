use esp_hal::gpio::Input;

use embassy_time::{Duration, Timer};

use mp3_core::control::ControlEvent;

use crate::EventQueue;

const DEBOUNCE_DURATION: u64 = 100; // Milliseconds

/// One instance per front panel switch. The HAL's edge future is the
/// interrupt-safe hand-off out of ISR context; everything after the
/// await runs as a normal task.
#[embassy_executor::task(pool_size = 5)]
pub async fn button_monitor(
    mut pin: Input<'static>,
    event: ControlEvent,
    events: &'static EventQueue,
) {
    loop {
        pin.wait_for_falling_edge().await;

        // Debounce
        Timer::after(Duration::from_millis(DEBOUNCE_DURATION)).await;

        if pin.is_low() {
            // Pin is still low so acknowledge
            log::debug!("button pressed: {:?}", event);
            events.send(event).await;
        }
    }
}

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch;

use mp3_core::pipeline::{NowPlaying, WATCH_CONSUMERS};
use mp3_core::ui;

use crate::SharedDisplay;

/// Repaints the metadata screen whenever the reader starts a new song.
#[embassy_executor::task]
pub async fn now_playing(
    mut updates: watch::Receiver<'static, CriticalSectionRawMutex, NowPlaying, WATCH_CONSUMERS>,
    display: &'static SharedDisplay,
) {
    loop {
        let playing = updates.changed().await;
        log::info!("now playing {}", playing.name.as_str());

        let mut surface = display.lock().await;
        if let Err(err) = ui::draw_metadata(&mut *surface, &playing).await {
            log::warn!("display error: {:?}", err);
        }
    }
}

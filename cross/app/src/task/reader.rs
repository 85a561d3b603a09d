use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch;

use mp3_core::pipeline::{
    BlockQueue, NowPlaying, Reader, SongEnded, SongRequests, WATCH_CONSUMERS,
};

use crate::PlayerStorage;

/// The producer task: streams requested songs off the SD card into
/// the block queue.
#[embassy_executor::task]
pub async fn reader(
    storage: PlayerStorage,
    requests: &'static SongRequests<CriticalSectionRawMutex>,
    blocks: &'static BlockQueue<CriticalSectionRawMutex>,
    now_playing: watch::Sender<'static, CriticalSectionRawMutex, NowPlaying, WATCH_CONSUMERS>,
    song_ended: &'static SongEnded<CriticalSectionRawMutex>,
) {
    Reader::new(storage, requests, blocks, now_playing, song_ended)
        .run()
        .await
}

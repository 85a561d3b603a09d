use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::watch;

use mp3_core::control::{ControlAction, ControlEvent, Controller};
use mp3_core::pipeline::{SongEnded, SongRequests, WATCH_CONSUMERS};
use mp3_core::ui;
use vs1053_driver::Register;

use crate::{EventQueue, SharedCodec, SharedDisplay, MAX_PLAYLIST_SONGS};

/// The event loop behind the front panel: button events and
/// end-of-song notifications go into the state machine, and the
/// resulting actions are applied to the pipeline, the codec and the
/// display.
#[embassy_executor::task]
pub async fn control(
    mut controller: Controller<MAX_PLAYLIST_SONGS>,
    events: &'static EventQueue,
    song_ended: &'static SongEnded<CriticalSectionRawMutex>,
    requests: &'static SongRequests<CriticalSectionRawMutex>,
    pause: watch::Sender<'static, CriticalSectionRawMutex, bool, WATCH_CONSUMERS>,
    codec: &'static SharedCodec,
    display: &'static SharedDisplay,
) {
    loop {
        let event = match select(events.receive(), song_ended.wait()).await {
            Either::First(event) => event,
            Either::Second(()) => ControlEvent::Advance,
        };

        for action in controller.handle(event) {
            apply(&controller, action, requests, &pause, codec, display).await;
        }
    }
}

async fn apply(
    controller: &Controller<MAX_PLAYLIST_SONGS>,
    action: ControlAction,
    requests: &'static SongRequests<CriticalSectionRawMutex>,
    pause: &watch::Sender<'static, CriticalSectionRawMutex, bool, WATCH_CONSUMERS>,
    codec: &'static SharedCodec,
    display: &'static SharedDisplay,
) {
    match action {
        ControlAction::Request(name) => requests.signal(name),

        ControlAction::Pause => pause.send(true),
        ControlAction::Resume => pause.send(false),

        ControlAction::SetVolume(level) => {
            let mut driver_unlocked = codec.lock().await;
            if let Some(driver) = driver_unlocked.as_mut() {
                if let Err(err) = driver.set_volume(level.attenuation()).await {
                    log::warn!("volume write failed: {:?}", err);
                } else if let Ok(readback) = driver.sci_read(Register::Volume).await {
                    log::debug!("volume register now {:#06x}", readback);
                }
            }
        }

        ControlAction::ShowPlaylist => {
            let mut surface = display.lock().await;
            if let Err(err) = ui::draw_playlist(&mut *surface, controller.playlist()).await {
                log::warn!("display error: {:?}", err);
            }
        }

        ControlAction::ShowPlaying => {
            let name = controller.playlist().current().unwrap_or("");
            let mut surface = display.lock().await;
            if let Err(err) = ui::draw_playing(&mut *surface, name).await {
                log::warn!("display error: {:?}", err);
            }
        }

        ControlAction::ShowPaused => {
            let name = controller.playlist().current().unwrap_or("");
            let mut surface = display.lock().await;
            if let Err(err) = ui::draw_paused(&mut *surface, name).await {
                log::warn!("display error: {:?}", err);
            }
        }

        ControlAction::ShowVolume(level) => {
            let mut surface = display.lock().await;
            if let Err(err) = ui::draw_volume(&mut *surface, level).await {
                log::warn!("display error: {:?}", err);
            }
        }
    }
}

#![no_std]
#![no_main]

//! An SD-card MP3 player
//!
//! One SPI bus carries four devices: the VS1053 decoder's command and
//! data ports, the SD card and the OLED. The reader task streams the
//! requested song off the card into a two-block queue, the player task
//! drains it into the decoder, and five front panel switches drive the
//! control task. Everything the tasks share is declared as a static
//! here and handed over at spawn time.

mod async_delay;
mod hardware;
mod sd_storage;
mod spi_device_adapter;
mod task;

use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, Output},
    spi::master::{Config as SpiConfig, Spi},
    time::RateExtU32,
};

use embassy_executor::Spawner;
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDeviceWithConfig;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_sync::watch::Watch;
use embassy_time::{Duration, Timer};

use embedded_sdmmc::SdCard;
use static_cell::StaticCell;

use mp3_core::control::{ControlEvent, Controller};
use mp3_core::display::{ScrollDirection, Surface};
use mp3_core::pipeline::{BlockQueue, NowPlayingWatch, PauseWatch, SongEnded, SongRequests};
use mp3_core::state::VolumeLevel;
use mp3_core::ui;
use playlist::Playlist;
use vs1053_driver::Vs1053Driver;

use async_delay::AsyncDelay;
use hardware::Hardware;
use sd_storage::{NullTimeSource, SdStorage};
use ssd1306_driver::Oled;
use spi_device_adapter::BlockingSpiAdapter;
use task::{
    button_monitor::button_monitor, control::control, now_playing::now_playing, player::player,
    reader::reader,
};

pub const MAX_PLAYLIST_SONGS: usize = 32;

type SharedSpiBus = Mutex<NoopRawMutex, Spi<'static, esp_hal::Async>>;

pub type BusDevice =
    SpiDeviceWithConfig<'static, NoopRawMutex, Spi<'static, esp_hal::Async>, Output<'static>>;

pub type CodecDriver = Vs1053Driver<BusDevice, Input<'static>, Output<'static>, AsyncDelay>;

// The codec is shared between the player (data bytes) and the control
// task (volume writes), so it lives behind a mutex.
pub type SharedCodec = Mutex<CriticalSectionRawMutex, Option<CodecDriver>>;

pub type OledDisplay = Oled<BusDevice, Output<'static>>;
pub type SharedDisplay = Mutex<CriticalSectionRawMutex, OledDisplay>;

pub type PlayerStorage =
    SdStorage<SdCard<BlockingSpiAdapter<BusDevice>, embassy_time::Delay>, NullTimeSource>;

pub type EventQueue = Channel<CriticalSectionRawMutex, ControlEvent, 8>;

static CODEC: SharedCodec = Mutex::new(None);
static DISPLAY: StaticCell<SharedDisplay> = StaticCell::new();

static SONG_REQUESTS: SongRequests<CriticalSectionRawMutex> = Signal::new();
static BLOCKS: BlockQueue<CriticalSectionRawMutex> = Channel::new();
static SONG_ENDED: SongEnded<CriticalSectionRawMutex> = Signal::new();
static NOW_PLAYING: NowPlayingWatch<CriticalSectionRawMutex> = Watch::new();
static PAUSE: PauseWatch<CriticalSectionRawMutex> = Watch::new();
static CONTROL_EVENTS: EventQueue = Channel::new();

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    log::info!("MP3 player starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let hardware = Hardware::init(peripherals);
    esp_hal_embassy::init(hardware.system_timer.alarm0);

    static SPI_BUS: StaticCell<SharedSpiBus> = StaticCell::new();
    let spi_bus = SPI_BUS.init(Mutex::new(hardware.spi_bus));

    // Per-device SPI speeds: the decoder's command port is slow by
    // datasheet, the data port and the rest run fast.
    let mut spi_sci_config = SpiConfig::default();
    spi_sci_config.frequency = 250.kHz();

    let mut spi_sdi_config = SpiConfig::default();
    spi_sdi_config.frequency = 8000.kHz();

    let mut spi_sd_config = SpiConfig::default();
    spi_sd_config.frequency = 16.MHz();

    let mut spi_oled_config = SpiConfig::default();
    spi_oled_config.frequency = 8.MHz();

    let spi_sci_device = SpiDeviceWithConfig::new(spi_bus, hardware.xcs, spi_sci_config);
    let spi_sdi_device = SpiDeviceWithConfig::new(spi_bus, hardware.xdcs, spi_sdi_config);
    let spi_sd_device = SpiDeviceWithConfig::new(spi_bus, hardware.sd_cs, spi_sd_config);
    let spi_oled_device = SpiDeviceWithConfig::new(spi_bus, hardware.oled_cs, spi_oled_config);

    // Display first so boot progress is visible
    let mut display = Oled::new(spi_oled_device, hardware.oled_dc);
    display
        .begin()
        .await
        .expect("ERROR: Cannot initialise the display");
    welcome_screen(&mut display).await;

    // Bring up the decoder. Without it the device is useless, so a
    // failure here is fatal and shown on the display.
    let driver = Vs1053Driver::new(
        spi_sci_device,
        spi_sdi_device,
        hardware.dreq,
        hardware.reset,
        AsyncDelay::new(),
    );
    {
        *(CODEC.lock().await) = Some(driver);
        let mut driver_unlocked = CODEC.lock().await;
        if let Some(driver) = driver_unlocked.as_mut() {
            if let Err(err) = driver.begin().await {
                let _ = display.print("DECODER FAIL", 0).await;
                panic!("ERROR: Cannot initialise the decoder: {:?}", err);
            }
            driver
                .set_volume(VolumeLevel::default().attenuation())
                .await
                .expect("ERROR: Cannot set the initial volume");
            match driver.dump_registers().await {
                Ok(dump) => log::info!("decoder registers at boot: {:?}", dump),
                Err(err) => log::warn!("cannot dump the decoder registers: {:?}", err),
            }
        }
    }

    // Mount the SD card and collect the playlist
    let sd_card = SdCard::new(BlockingSpiAdapter::new(spi_sd_device), embassy_time::Delay);
    let mut storage =
        SdStorage::new(sd_card, NullTimeSource).expect("ERROR: Cannot mount the SD card");

    let mut song_list: Playlist<MAX_PLAYLIST_SONGS, { mp3_core::MAX_SONG_NAME }> = Playlist::new();
    storage
        .populate_playlist(&mut song_list)
        .expect("ERROR: Cannot list the songs");
    log::info!("{} songs on the card", song_list.len());

    if let Err(err) = ui::draw_playlist(&mut display, &song_list).await {
        log::warn!("display error: {:?}", err);
    }

    let display = DISPLAY.init(Mutex::new(display));

    // The player polls the pause flag, so it must hold a value before
    // the first block arrives.
    PAUSE.sender().send(false);

    let controller = Controller::new(song_list);

    spawner.must_spawn(reader(
        storage,
        &SONG_REQUESTS,
        &BLOCKS,
        NOW_PLAYING.sender(),
        &SONG_ENDED,
    ));
    spawner.must_spawn(player(
        &BLOCKS,
        PAUSE.receiver().expect("ERROR: Out of pause receivers"),
        &CODEC,
    ));
    spawner.must_spawn(control(
        controller,
        &CONTROL_EVENTS,
        &SONG_ENDED,
        &SONG_REQUESTS,
        PAUSE.sender(),
        &CODEC,
        display,
    ));
    spawner.must_spawn(now_playing(
        NOW_PLAYING
            .receiver()
            .expect("ERROR: Out of now-playing receivers"),
        display,
    ));

    spawner.must_spawn(button_monitor(
        hardware.pause_button,
        ControlEvent::PauseToggle,
        &CONTROL_EVENTS,
    ));
    spawner.must_spawn(button_monitor(
        hardware.navigate_button,
        ControlEvent::NavigateDown,
        &CONTROL_EVENTS,
    ));
    spawner.must_spawn(button_monitor(
        hardware.select_button,
        ControlEvent::SelectSong,
        &CONTROL_EVENTS,
    ));
    spawner.must_spawn(button_monitor(
        hardware.volume_up_button,
        ControlEvent::VolumeUp,
        &CONTROL_EVENTS,
    ));
    spawner.must_spawn(button_monitor(
        hardware.volume_down_button,
        ControlEvent::VolumeDown,
        &CONTROL_EVENTS,
    ));

    log::info!("all tasks spawned");
}

/// The boot greeting: a scrolling banner, held for a moment and then
/// cleared. The RAM content has to be rewritten after the scroll
/// stops, which the erase takes care of.
async fn welcome_screen(display: &mut OledDisplay) {
    let _ = display.print("MP3 PLAYER", 3).await;
    let _ = display.scroll(ScrollDirection::Left).await;
    Timer::after(Duration::from_millis(2000)).await;
    let _ = display.stop_scroll().await;
    let _ = display.erase_all().await;
}

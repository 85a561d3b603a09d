// Based on https://users.rust-lang.org/t/how-to-borrow-peripherals-struct/83565/3

use esp_hal::{
    gpio::{Input, Level, Output, Pull},
    peripherals::Peripherals,
    spi::master::{Config as SpiConfig, Spi},
    timer::systimer::SystemTimer,
};

/// All the initialised peripherals the player uses, in one struct so
/// `main` can hand them out to the tasks.
///
/// Everything hangs off one SPI bus (only SPI2 is available on the
/// ESP32-C3): the decoder's SCI and SDI ports, the SD card and the
/// OLED each get their own chip select.
pub struct Hardware {
    // VS1053 decoder
    pub xcs: Output<'static>,
    pub xdcs: Output<'static>,
    pub dreq: Input<'static>,
    pub reset: Output<'static>,

    // SD card
    pub sd_cs: Output<'static>,

    // OLED
    pub oled_cs: Output<'static>,
    pub oled_dc: Output<'static>,

    // Front panel switches, active low
    pub pause_button: Input<'static>,
    pub navigate_button: Input<'static>,
    pub select_button: Input<'static>,
    pub volume_up_button: Input<'static>,
    pub volume_down_button: Input<'static>,

    pub system_timer: SystemTimer,

    pub spi_bus: Spi<'static, esp_hal::Async>,
}

impl Hardware {
    pub fn init(peripherals: Peripherals) -> Hardware {
        let systimer = peripherals.SYSTIMER;

        // Create the SPI from the HAL. This implements SpiBus, not SpiDevice!
        let spi_bus: Spi<'_, esp_hal::Async> = Spi::new(peripherals.SPI2, SpiConfig::default())
            .expect("Panic: Could not initialize SPI")
            .with_sck(peripherals.GPIO5)
            .with_mosi(peripherals.GPIO6)
            .with_miso(peripherals.GPIO7)
            .into_async();

        Hardware {
            xcs: Output::new(peripherals.GPIO9, Level::High),
            xdcs: Output::new(peripherals.GPIO10, Level::High),
            dreq: Input::new(peripherals.GPIO8, Pull::None),
            reset: Output::new(peripherals.GPIO20, Level::High),

            sd_cs: Output::new(peripherals.GPIO0, Level::High),

            oled_cs: Output::new(peripherals.GPIO18, Level::High),
            oled_dc: Output::new(peripherals.GPIO19, Level::Low),

            pause_button: Input::new(peripherals.GPIO1, Pull::Up),
            navigate_button: Input::new(peripherals.GPIO2, Pull::Up),
            select_button: Input::new(peripherals.GPIO3, Pull::Up),
            volume_up_button: Input::new(peripherals.GPIO4, Pull::Up),
            volume_down_button: Input::new(peripherals.GPIO21, Pull::Up),

            system_timer: SystemTimer::new(systimer),

            spi_bus,
        }
    }
}

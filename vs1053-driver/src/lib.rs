#![cfg_attr(not(test), no_std)]

//! Driver for the VS1053b audio decoder.
//!
//! The decoder sits on two SPI devices sharing one bus: the SCI
//! (command) device and the SDI (data) device. The chip selects (XCS
//! and XDCS) are managed by the `SpiDevice`s, so this driver never
//! toggles them itself. If the hal only provides an `SpiBus` then see
//! [this](https://github.com/rust-embedded/embedded-hal/blob/master/docs/migrating-from-0.2-to-1.0.md#for-end-users)
//! on how to convert a `SpiBus` into `SpiDevice`s.
//!
//! SPI clock rates are set externally (e.g. with `SpiDeviceWithConfig`).
//! The chip starts up in 1.0x clock mode, so the SCI device must stay
//! conservative (~250 kHz); once `begin()` has written CLOCKF the SDI
//! device may run at several MHz.

use embassy_futures::select::{select, Either};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::{Operation, SpiDevice};

mod dump_registers;
mod registers;

pub use dump_registers::RegisterDump;
pub use registers::{Mode, Register};

const SCI_READ: u8 = 0b0000_0011;
const SCI_WRITE: u8 = 0b0000_0010;

// CLOCKF value requesting a 3.5x internal clock multiplier.
const CLOCKF_DEFAULT: u16 = 0x6000;

// Attenuation written to both channels after reset. 0x00 is loudest,
// 0xFE near-mute; 0x25 per channel is a comfortable level.
const INITIAL_VOLUME: u16 = 0x2525;

// Version nibble the STATUS register reports for a VS1053b.
const VS1053_VERSION: u8 = 4;

// DREQ is awaited with a bounded retry so a stalled decoder surfaces
// as DreqTimeout instead of hanging the player forever.
const DREQ_POLL_MS: u32 = 10;
const DREQ_RETRIES: u32 = 50;

pub struct Vs1053Driver<SPI, DREQ, RST, DLY> {
    spi_control_device: SPI,
    spi_data_device: SPI,
    dreq: DREQ,
    reset: RST,
    delay: DLY,
}

impl<SPI, DREQ, RST, DLY> Vs1053Driver<SPI, DREQ, RST, DLY>
where
    SPI: SpiDevice,
    DREQ: Wait,
    RST: OutputPin,
    DLY: DelayNs,
{
    pub fn new(
        spi_control_device: SPI,
        spi_data_device: SPI,
        dreq: DREQ,
        reset: RST,
        delay: DLY,
    ) -> Self {
        Vs1053Driver {
            spi_control_device,
            spi_data_device,
            dreq,
            reset,
            delay,
        }
    }

    /// Bring the decoder up after power-on: hard reset, clock
    /// configuration, initial volume and a STATUS sanity check.
    ///
    /// A missing or wrong chip is reported as
    /// [`DriverError::BadStatus`] so that startup can fail visibly
    /// instead of streaming into a dead bus.
    pub async fn begin(&mut self) -> Result<(), DriverError> {
        self.reset.set_high().map_err(|_| DriverError::Reset)?;

        self.reset_device().await?;

        let status = self.sci_read(Register::Status).await?;
        let version = ((status >> 4) & 0x0F) as u8;
        if version != VS1053_VERSION {
            return Err(DriverError::BadStatus { version });
        }

        Ok(())
    }

    /// Hard reset: pulse XRESET, soft-reset, then raise the internal
    /// clock and set the initial volume.
    pub async fn reset_device(&mut self) -> Result<(), DriverError> {
        self.reset.set_low().map_err(|_| DriverError::Reset)?;
        self.delay.delay_ms(10).await;
        self.reset.set_high().map_err(|_| DriverError::Reset)?;
        self.delay.delay_ms(10).await;

        // From the data sheet: after a hardware reset DREQ stays down
        // for around 22000 clock cycles. Wait for it rather than
        // guessing a delay.
        self.await_data_request().await?;

        self.soft_reset().await?;

        // Set the clock multiplier as soon as possible after the soft
        // reset. Only after this may the SDI SPI speed be raised.
        self.sci_write(Register::Clockf, CLOCKF_DEFAULT).await?;
        self.await_data_request().await?;

        self.set_volume(INITIAL_VOLUME).await?;

        Ok(())
    }

    pub async fn soft_reset(&mut self) -> Result<(), DriverError> {
        self.sci_write(Register::Mode, (Mode::SDI_NEW | Mode::RESET).bits())
            .await?;

        self.delay.delay_ms(10).await;

        self.await_data_request().await
    }

    /// Write the volume register: high byte left channel attenuation,
    /// low byte right channel. Callers wanting confirmation can read
    /// [`Register::Volume`] back; that readback is optional.
    pub async fn set_volume(&mut self, attenuation: u16) -> Result<(), DriverError> {
        self.sci_write(Register::Volume, attenuation).await
    }

    pub async fn sci_read(&mut self, register: Register) -> Result<u16, DriverError> {
        self.await_data_request().await?;

        let mut buf: [u8; 2] = [0; 2];

        self.spi_control_device
            .transaction(&mut [
                Operation::Write(&[SCI_READ, register.into()]),
                Operation::Read(&mut buf),
            ])
            .await
            .map_err(|_| DriverError::SpiRead)?;

        Ok(u16::from_be_bytes(buf))
    }

    pub async fn sci_write(&mut self, register: Register, data: u16) -> Result<(), DriverError> {
        self.await_data_request().await?;

        let data = data.to_be_bytes();
        let buf: [u8; 4] = [SCI_WRITE, register.into(), data[0], data[1]];

        self.spi_control_device
            .transaction(&mut [Operation::Write(&buf)])
            .await
            .map_err(|_| DriverError::SpiWrite)?;

        Ok(())
    }

    /// Feed one byte of the audio stream to the SDI port, first
    /// waiting until the decoder requests data.
    pub async fn send_data_byte(&mut self, byte: u8) -> Result<(), DriverError> {
        self.await_data_request().await?;

        self.spi_data_device
            .transaction(&mut [Operation::Write(&[byte])])
            .await
            .map_err(|_| DriverError::SpiWrite)?;

        Ok(())
    }

    /// Snapshot of the registers worth logging at boot.
    pub async fn dump_registers(&mut self) -> Result<RegisterDump, DriverError> {
        Ok(RegisterDump {
            mode: self.sci_read(Register::Mode).await?,
            status: self.sci_read(Register::Status).await?,
            clock_f: self.sci_read(Register::Clockf).await?,
            volume: self.sci_read(Register::Volume).await?,
            audio_data: self.sci_read(Register::AuData).await?,
        })
    }

    // Wait until DREQ is high, i.e. the decoder will accept more
    // input. Bounded at DREQ_RETRIES * DREQ_POLL_MS.
    async fn await_data_request(&mut self) -> Result<(), DriverError> {
        let dreq = &mut self.dreq;
        let delay = &mut self.delay;

        for _ in 0..DREQ_RETRIES {
            match select(dreq.wait_for_high(), delay.delay_ms(DREQ_POLL_MS)).await {
                Either::First(result) => return result.map_err(|_| DriverError::DReq),
                Either::Second(()) => {}
            }
        }

        Err(DriverError::DreqTimeout)
    }

    // Destroys the driver and releases the peripherals
    pub fn release(self) -> (SPI, SPI, DREQ, RST, DLY) {
        (
            self.spi_control_device,
            self.spi_data_device,
            self.dreq,
            self.reset,
            self.delay,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverError {
    SpiRead,
    SpiWrite,
    // An error in waiting for the DREQ signal
    DReq,
    // The decoder did not request data within the bounded wait
    DreqTimeout,
    // An error in setting the reset pin
    Reset,
    // The STATUS register did not identify a VS1053b
    BadStatus { version: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    type MockDriver = Vs1053Driver<SpiMock<u8>, PinMock, PinMock, NoopDelay>;

    fn finish(driver: MockDriver) {
        let (mut spi_control_device, mut spi_data_device, mut dreq, mut reset, _delay) =
            driver.release();

        spi_control_device.done();
        spi_data_device.done();
        dreq.done();
        reset.done();
    }

    #[async_std::test]
    async fn sci_read_test() {
        let spi_control_expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_READ, 0x0B]),
            SpiTransaction::read_vec(vec![0xAA, 0xBB]),
            SpiTransaction::transaction_end(),
        ];
        let spi_control_device = SpiMock::new(&spi_control_expectations);
        let spi_data_device = SpiMock::new(&[]);

        let dreq = PinMock::new(&[PinTransaction::wait_for_state(State::High)]);
        let reset = PinMock::new(&[]);

        let mut driver = Vs1053Driver::new(
            spi_control_device,
            spi_data_device,
            dreq,
            reset,
            NoopDelay::new(),
        );

        let value = driver.sci_read(Register::Volume).await.unwrap();
        assert_eq!(value, 0xAABB);

        finish(driver);
    }

    #[async_std::test]
    async fn sci_write_test() {
        let spi_control_expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_WRITE, 0x03, 0x60, 0x00]),
            SpiTransaction::transaction_end(),
        ];
        let spi_control_device = SpiMock::new(&spi_control_expectations);
        let spi_data_device = SpiMock::new(&[]);

        let dreq = PinMock::new(&[PinTransaction::wait_for_state(State::High)]);
        let reset = PinMock::new(&[]);

        let mut driver = Vs1053Driver::new(
            spi_control_device,
            spi_data_device,
            dreq,
            reset,
            NoopDelay::new(),
        );

        driver.sci_write(Register::Clockf, 0x6000).await.unwrap();

        finish(driver);
    }

    #[async_std::test]
    async fn volume_test() {
        // Attenuation 0x25 on both channels
        let spi_control_expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_WRITE, 0x0B, 0x25, 0x25]),
            SpiTransaction::transaction_end(),
        ];
        let spi_control_device = SpiMock::new(&spi_control_expectations);
        let spi_data_device = SpiMock::new(&[]);

        let dreq = PinMock::new(&[PinTransaction::wait_for_state(State::High)]);
        let reset = PinMock::new(&[]);

        let mut driver = Vs1053Driver::new(
            spi_control_device,
            spi_data_device,
            dreq,
            reset,
            NoopDelay::new(),
        );

        driver.set_volume(0x2525).await.unwrap();

        finish(driver);
    }

    #[async_std::test]
    async fn send_data_byte_goes_to_the_data_device() {
        let spi_control_device = SpiMock::new(&[]);

        let spi_data_expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x5A]),
            SpiTransaction::transaction_end(),
        ];
        let spi_data_device = SpiMock::new(&spi_data_expectations);

        let dreq = PinMock::new(&[PinTransaction::wait_for_state(State::High)]);
        let reset = PinMock::new(&[]);

        let mut driver = Vs1053Driver::new(
            spi_control_device,
            spi_data_device,
            dreq,
            reset,
            NoopDelay::new(),
        );

        driver.send_data_byte(0x5A).await.unwrap();

        finish(driver);
    }

    // Expectations for the begin() sequence, parameterised over the
    // STATUS register reply.
    fn begin_expectations(
        status: [u8; 2],
    ) -> (
        Vec<SpiTransaction<u8>>,
        Vec<PinTransaction>,
        Vec<PinTransaction>,
    ) {
        let spi_control = vec![
            // soft_reset: MODE := SDI_NEW | RESET
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_WRITE, 0x00, 0x08, 0x04]),
            SpiTransaction::transaction_end(),
            // CLOCKF := 0x6000
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_WRITE, 0x03, 0x60, 0x00]),
            SpiTransaction::transaction_end(),
            // initial volume
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_WRITE, 0x0B, 0x25, 0x25]),
            SpiTransaction::transaction_end(),
            // STATUS read
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![SCI_READ, 0x01]),
            SpiTransaction::read_vec(status.to_vec()),
            SpiTransaction::transaction_end(),
        ];

        let reset = vec![
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ];

        // One DREQ wait after the reset pulse, one inside each of the
        // four SCI operations, one at the end of soft_reset and one
        // after the CLOCKF write.
        let dreq = vec![PinTransaction::wait_for_state(State::High); 7];

        (spi_control, reset, dreq)
    }

    #[async_std::test]
    async fn begin_accepts_a_vs1053() {
        // Version nibble 4 identifies a VS1053b
        let (spi_control, reset, dreq) = begin_expectations([0x00, 0x40]);

        let mut driver = Vs1053Driver::new(
            SpiMock::new(&spi_control),
            SpiMock::new(&[]),
            PinMock::new(&dreq),
            PinMock::new(&reset),
            NoopDelay::new(),
        );

        driver.begin().await.unwrap();

        finish(driver);
    }

    #[async_std::test]
    async fn dump_registers_reads_the_boot_set() {
        let replies: [(u8, [u8; 2]); 5] = [
            (0x00, [0x48, 0x00]), // MODE
            (0x01, [0x00, 0x40]), // STATUS
            (0x03, [0x60, 0x00]), // CLOCKF
            (0x0B, [0x25, 0x25]), // VOL
            (0x05, [0xAC, 0x45]), // AUDATA
        ];

        let mut spi_control_expectations = Vec::new();
        for (address, reply) in replies {
            spi_control_expectations.extend([
                SpiTransaction::transaction_start(),
                SpiTransaction::write_vec(vec![SCI_READ, address]),
                SpiTransaction::read_vec(reply.to_vec()),
                SpiTransaction::transaction_end(),
            ]);
        }

        let dreq = PinMock::new(&vec![PinTransaction::wait_for_state(State::High); 5]);

        let mut driver = Vs1053Driver::new(
            SpiMock::new(&spi_control_expectations),
            SpiMock::new(&[]),
            dreq,
            PinMock::new(&[]),
            NoopDelay::new(),
        );

        let dump = driver.dump_registers().await.unwrap();
        assert_eq!(
            dump,
            RegisterDump {
                mode: 0x4800,
                status: 0x0040,
                clock_f: 0x6000,
                volume: 0x2525,
                audio_data: 0xAC45,
            }
        );

        finish(driver);
    }

    // DREQ held low for good: the wait future never completes, so the
    // bounded retry loop must give up.
    struct StuckLowPin;

    impl embedded_hal::digital::ErrorType for StuckLowPin {
        type Error = core::convert::Infallible;
    }

    impl Wait for StuckLowPin {
        async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }

        async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
            core::future::pending().await
        }
    }

    #[async_std::test]
    async fn a_stalled_decoder_surfaces_as_a_timeout() {
        let mut driver = Vs1053Driver::new(
            SpiMock::new(&[]),
            SpiMock::new(&[]),
            StuckLowPin,
            PinMock::new(&[]),
            NoopDelay::new(),
        );

        assert_eq!(
            driver.send_data_byte(0x5A).await,
            Err(DriverError::DreqTimeout)
        );

        let (mut spi_control_device, mut spi_data_device, _dreq, mut reset, _delay) =
            driver.release();
        spi_control_device.done();
        spi_data_device.done();
        reset.done();
    }

    #[async_std::test]
    async fn begin_rejects_an_unknown_chip() {
        // Version nibble 3 is a VS1003, not the chip we drive
        let (spi_control, reset, dreq) = begin_expectations([0x00, 0x30]);

        let mut driver = Vs1053Driver::new(
            SpiMock::new(&spi_control),
            SpiMock::new(&[]),
            PinMock::new(&dreq),
            PinMock::new(&reset),
            NoopDelay::new(),
        );

        assert_eq!(
            driver.begin().await,
            Err(DriverError::BadStatus { version: 3 })
        );

        finish(driver);
    }
}

//! The SD card stack (`embedded-sdmmc`) wants a *blocking*
//! `embedded_hal::spi::SpiDevice`, but the shared bus hands out async
//! devices. This adapter closes the gap by running each transaction to
//! completion with `embassy_futures::block_on`.
//!
//! That is acceptable here because SD traffic happens from task
//! context only and the bus mutex keeps the codec devices safe while a
//! transaction is in flight.

use embassy_futures::block_on;
use embedded_hal::spi::Operation;

pub struct BlockingSpiAdapter<T> {
    wrapped: T,
}

impl<T> BlockingSpiAdapter<T> {
    pub fn new(wrapped: T) -> Self {
        Self { wrapped }
    }
}

impl<T> embedded_hal::spi::ErrorType for BlockingSpiAdapter<T>
where
    T: embedded_hal_async::spi::SpiDevice<u8>,
{
    type Error = T::Error;
}

impl<T> embedded_hal::spi::SpiDevice<u8> for BlockingSpiAdapter<T>
where
    T: embedded_hal_async::spi::SpiDevice<u8>,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        block_on(self.wrapped.transaction(operations))
    }
}

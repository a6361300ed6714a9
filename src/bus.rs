//! Register transport contract and the stock I2C adapter.

use crate::{Error, Result};

/// Byte-oriented register transport the chip sits behind.
///
/// Implementations are expected to complete or fail each access
/// synchronously from the caller's point of view; the driver applies no
/// timeouts of its own.
pub trait RegisterBus {
    /// Replaces the masked bits of the register at `addr` with `value`,
    /// preserving the rest.
    async fn read_modify_write(&mut self, addr: u8, mask: u8, value: u8) -> Result<()>;

    /// Writes one full register byte.
    async fn write_byte(&mut self, addr: u8, value: u8) -> Result<()>;
}

/// Factory-assigned 7-bit I2C device address.
pub const DEFAULT_ADDRESS: u8 = 0x36;

/// [`RegisterBus`] over any `embedded-hal-async` I2C bus.
pub struct I2cRegisterBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cRegisterBus<I2C> {
    /// Wraps an I2C bus at the factory-assigned device address.
    #[must_use]
    pub const fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    /// Wraps an I2C bus at a custom device address.
    #[must_use]
    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: embedded_hal_async::i2c::I2c> RegisterBus for I2cRegisterBus<I2C> {
    async fn read_modify_write(&mut self, addr: u8, mask: u8, value: u8) -> Result<()> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[addr], &mut buf)
            .await
            .map_err(|_| Error::Bus)?;
        let merged = (buf[0] & !mask) | (value & mask);
        self.i2c
            .write(self.address, &[addr, merged])
            .await
            .map_err(|_| Error::Bus)
    }

    async fn write_byte(&mut self, addr: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[addr, value])
            .await
            .map_err(|_| Error::Bus)
    }
}

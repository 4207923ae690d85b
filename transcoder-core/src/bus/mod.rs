//! Addressed command bus shared by the decoder and encoder.
//!
//! Chip recipes talk to [`CommandBus`]; [`I2cBus`] adapts any
//! `embedded_hal::i2c::I2c` implementation so the same recipes run against
//! the MCU peripheral, a host mock, or the emulator's simulated board.

use core::fmt;

use embedded_hal::i2c::I2c;
use heapless::Vec;

/// Largest register payload sent in one transaction (register byte excluded).
pub const MAX_WRITE_PAYLOAD: usize = 16;

/// A failed bus transaction. Fatal to the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BusFault {
    /// 7-bit device address that did not complete the transaction.
    pub address: u8,
    /// Number of bytes the transaction attempted to move, including the register byte.
    pub size: usize,
}

impl BusFault {
    #[must_use]
    pub const fn new(address: u8, size: usize) -> Self {
        Self { address, size }
    }
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus transaction to 0x{:02x} failed ({} bytes)",
            self.address, self.size
        )
    }
}

/// Register-oriented transport used by the chip recipes.
pub trait CommandBus {
    /// Writes `bytes` starting at `register` on `device`.
    fn write(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusFault>;

    /// Reads one register from `device`.
    fn read(&mut self, device: u8, register: u8) -> Result<u8, BusFault>;

    /// Writes a single register, ignoring a failure.
    ///
    /// Reserved for software-reset writes where the device may drop off the
    /// bus before acknowledging.
    fn write_allowing_failure(&mut self, device: u8, register: u8, value: u8) {
        let _ = self.write(device, register, &[value]);
    }

    /// Convenience single-register write.
    fn write_register(&mut self, device: u8, register: u8, value: u8) -> Result<(), BusFault> {
        self.write(device, register, &[value])
    }
}

impl<B: CommandBus + ?Sized> CommandBus for &mut B {
    fn write(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusFault> {
        (**self).write(device, register, bytes)
    }

    fn read(&mut self, device: u8, register: u8) -> Result<u8, BusFault> {
        (**self).read(device, register)
    }
}

/// [`CommandBus`] over an `embedded-hal` I2C master.
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    #[must_use]
    pub const fn new(i2c: I) -> Self {
        Self { i2c }
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    #[must_use]
    pub fn into_inner(self) -> I {
        self.i2c
    }
}

impl<I: I2c> CommandBus for I2cBus<I> {
    fn write(&mut self, device: u8, register: u8, bytes: &[u8]) -> Result<(), BusFault> {
        let size = bytes.len() + 1;
        let mut frame: Vec<u8, { MAX_WRITE_PAYLOAD + 1 }> = Vec::new();
        frame
            .push(register)
            .map_err(|_| BusFault::new(device, size))?;
        frame
            .extend_from_slice(bytes)
            .map_err(|_| BusFault::new(device, size))?;

        self.i2c
            .write(device, &frame)
            .map_err(|_| BusFault::new(device, size))
    }

    fn read(&mut self, device: u8, register: u8) -> Result<u8, BusFault> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(device, &[register], &mut value)
            .map_err(|_| BusFault::new(device, 2))?;
        Ok(value[0])
    }
}

use crate::Result;

/// Byte-level access to the sensor bus.
///
/// The sensor does not use register addresses: every read starts at the
/// head of its output buffer and every write is one whole SHTP transfer.
pub trait BusTransport: Send {
    /// Read up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `bytes` as one transfer, returning how many were written.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Block the calling thread for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write(bytes)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

#[cfg(target_os = "linux")]
pub use self::i2c::I2cTransport;

#[cfg(target_os = "linux")]
mod i2c {
    use super::BusTransport;
    use crate::{AttitudeError, Result};
    use rppal::i2c::I2c;

    /// Linux i2c-dev transport (`/dev/i2c-N`).
    pub struct I2cTransport {
        i2c: I2c,
        bus: u8,
        address: u16,
    }

    impl I2cTransport {
        /// Default BNO08x address (SA0 high).
        pub const DEFAULT_ADDRESS: u16 = 0x4A;
        /// Alternate BNO08x address (SA0 low).
        pub const ALTERNATE_ADDRESS: u16 = 0x4B;

        /// Open `/dev/i2c-<bus>` and claim `address`.
        pub fn open(bus: u8, address: u16) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus).map_err(|e| {
                AttitudeError::TransportUnavailable(format!("open /dev/i2c-{}: {}", bus, e))
            })?;
            i2c.set_slave_address(address).map_err(|e| {
                AttitudeError::TransportUnavailable(format!(
                    "claim address 0x{:02x} on /dev/i2c-{}: {}",
                    address, bus, e
                ))
            })?;

            log::info!("Opened /dev/i2c-{} at address 0x{:02x}", bus, address);
            Ok(Self { i2c, bus, address })
        }

        pub fn bus(&self) -> u8 {
            self.bus
        }

        pub fn address(&self) -> u16 {
            self.address
        }
    }

    impl BusTransport for I2cTransport {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            Ok(self.i2c.read(buf)?)
        }

        fn write(&mut self, bytes: &[u8]) -> Result<usize> {
            Ok(self.i2c.write(bytes)?)
        }
    }
}

// src/common/hal_traits.rs

use super::frame::FrameFormat;
use super::timing::Millis;
use crate::uplink::session::{JoinCredentials, Region};
use core::fmt::Debug;

/// Millisecond clock and blocking delays.
pub trait BusClock {
    /// Current value of the free-running millisecond counter.
    fn now(&self) -> Millis;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Half-duplex RS-485 serial port.
///
/// Direction switching (DE/RE) is the implementation's business: it must be
/// transmitting while bytes are written and back to receive once `flush`
/// completes.
pub trait Rs485Serial {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to read a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if no byte is available yet.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if the transmit buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer, ensuring all written bytes have been sent.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;

    /// Changes baud rate and character framing.
    fn set_config(&mut self, baud_rate: u32, frame: FrameFormat) -> Result<(), Self::Error>;
}

/// LoRaWAN modem that runs the MAC layer itself (AT-command modules and similar).
pub trait LoraModem {
    type Error: Debug;

    /// Powers up the modem and selects the regional channel plan.
    fn begin(&mut self, region: Region) -> Result<(), Self::Error>;

    /// Runs one OTAA join. `Ok(false)` means the network did not accept it.
    fn join_otaa(&mut self, credentials: &JoinCredentials) -> Result<bool, Self::Error>;

    fn is_joined(&self) -> bool;

    /// Largest application payload at the current data rate.
    fn max_payload_len(&self) -> usize;

    /// Queues `payload` on application port `port`.
    fn send(&mut self, port: u8, payload: &[u8], confirmed: bool) -> Result<(), Self::Error>;
}

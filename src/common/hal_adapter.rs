// src/common/hal_adapter.rs

use super::frame::FrameFormat;
use super::hal_traits::{BusClock, Rs485Serial};
use super::timing::Millis;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Error of a `DirectionControlled` port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectionError<SE, PE> {
    Serial(SE),
    Pin(PE),
}

/// Drives the transceiver's driver-enable line around an `Rs485Serial`.
///
/// DE goes high before the first byte of a frame and low once `flush`
/// reports the frame has left the UART. A failed write, or a read while a
/// frame is still marked in flight, also drops it.
#[derive(Debug)]
pub struct DirectionControlled<S, P> {
    serial: S,
    driver_enable: P,
    transmitting: bool,
}

impl<S, P> DirectionControlled<S, P>
where
    S: Rs485Serial,
    P: OutputPin,
{
    pub fn new(serial: S, driver_enable: P) -> Self {
        DirectionControlled { serial, driver_enable, transmitting: false }
    }

    pub fn release(self) -> (S, P) {
        (self.serial, self.driver_enable)
    }

    fn release_bus(&mut self) -> Result<(), DirectionError<S::Error, P::Error>> {
        if self.transmitting {
            self.driver_enable.set_low().map_err(DirectionError::Pin)?;
            self.transmitting = false;
        }
        Ok(())
    }
}

impl<S, P> Rs485Serial for DirectionControlled<S, P>
where
    S: Rs485Serial,
    P: OutputPin,
    P::Error: Debug,
{
    type Error = DirectionError<S::Error, P::Error>;

    fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
        // A frame abandoned mid-write must not keep driving the bus
        self.release_bus().map_err(nb::Error::Other)?;
        self.serial.read_byte().map_err(|e| e.map(DirectionError::Serial))
    }

    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if !self.transmitting {
            self.driver_enable
                .set_high()
                .map_err(|e| nb::Error::Other(DirectionError::Pin(e)))?;
            self.transmitting = true;
        }
        match self.serial.write_byte(byte) {
            Err(nb::Error::Other(e)) => {
                self.release_bus().map_err(nb::Error::Other)?;
                Err(nb::Error::Other(DirectionError::Serial(e)))
            }
            other => other.map_err(|e| e.map(DirectionError::Serial)),
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        match self.serial.flush() {
            Ok(()) => self.release_bus().map_err(nb::Error::Other),
            Err(nb::Error::WouldBlock) => Err(nb::Error::WouldBlock),
            Err(nb::Error::Other(e)) => {
                self.release_bus().map_err(nb::Error::Other)?;
                Err(nb::Error::Other(DirectionError::Serial(e)))
            }
        }
    }

    fn set_config(&mut self, baud_rate: u32, frame: FrameFormat) -> Result<(), Self::Error> {
        self.serial.set_config(baud_rate, frame).map_err(DirectionError::Serial)
    }
}

/// `BusClock` built from an embedded-hal delay and a millisecond counter.
pub struct HalClock<D, F> {
    delay: D,
    ticks: F,
}

impl<D, F> HalClock<D, F>
where
    D: DelayNs,
    F: Fn() -> u32,
{
    pub fn new(delay: D, ticks: F) -> Self {
        HalClock { delay, ticks }
    }
}

impl<D, F> BusClock for HalClock<D, F>
where
    D: DelayNs,
    F: Fn() -> u32,
{
    fn now(&self) -> Millis {
        Millis((self.ticks)())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    #[derive(Default)]
    struct MockPin {
        high: bool,
        transitions: u32,
    }
    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }
    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.transitions += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.transitions += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockSerial {
        written: Vec<u8>,
        fail_writes: bool,
        flushes: u32,
        config: Option<(u32, FrameFormat)>,
    }
    impl Rs485Serial for MockSerial {
        type Error = ();
        fn read_byte(&mut self) -> nb::Result<u8, ()> {
            Err(nb::Error::WouldBlock)
        }
        fn write_byte(&mut self, byte: u8) -> nb::Result<(), ()> {
            if self.fail_writes {
                return Err(nb::Error::Other(()));
            }
            self.written.push(byte);
            Ok(())
        }
        fn flush(&mut self) -> nb::Result<(), ()> {
            self.flushes += 1;
            Ok(())
        }
        fn set_config(&mut self, baud_rate: u32, frame: FrameFormat) -> Result<(), ()> {
            self.config = Some((baud_rate, frame));
            Ok(())
        }
    }

    #[test]
    fn test_driver_enable_wraps_frame() {
        let mut port = DirectionControlled::new(MockSerial::default(), MockPin::default());
        port.write_byte(0x01).unwrap();
        assert!(port.driver_enable.high);
        port.write_byte(0x03).unwrap();
        assert_eq!(port.driver_enable.transitions, 1);
        port.flush().unwrap();
        assert!(!port.driver_enable.high);

        let (serial, pin) = port.release();
        assert_eq!(serial.written, vec![0x01, 0x03]);
        assert_eq!(serial.flushes, 1);
        assert_eq!(pin.transitions, 2);
    }

    #[test]
    fn test_flush_without_write_leaves_pin() {
        let mut port = DirectionControlled::new(MockSerial::default(), MockPin::default());
        port.flush().unwrap();
        assert_eq!(port.driver_enable.transitions, 0);
    }

    #[test]
    fn test_write_error_drops_driver_enable() {
        let serial = MockSerial { fail_writes: true, ..MockSerial::default() };
        let mut port = DirectionControlled::new(serial, MockPin::default());
        let result = port.write_byte(0x01);
        assert!(matches!(result, Err(nb::Error::Other(DirectionError::Serial(())))));
        assert!(!port.driver_enable.high);
        assert!(!port.transmitting);
    }

    #[test]
    fn test_read_after_abandoned_write_drops_driver_enable() {
        let mut port = DirectionControlled::new(MockSerial::default(), MockPin::default());
        port.write_byte(0x01).unwrap();
        assert!(port.driver_enable.high);
        // Frame never flushed, e.g. the write timed out
        assert!(matches!(port.read_byte(), Err(nb::Error::WouldBlock)));
        assert!(!port.driver_enable.high);
        assert_eq!(port.driver_enable.transitions, 2);
    }

    #[test]
    fn test_set_config_passes_through() {
        let mut port = DirectionControlled::new(MockSerial::default(), MockPin::default());
        port.set_config(9600, FrameFormat::Rtu8E1).unwrap();
        assert_eq!(port.serial.config, Some((9600, FrameFormat::Rtu8E1)));
    }

    struct CountingDelay {
        total_ns: u64,
    }
    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn test_hal_clock_reads_ticks() {
        let ticks = Cell::new(42u32);
        let mut clock = HalClock::new(CountingDelay { total_ns: 0 }, || ticks.get());
        assert_eq!(clock.now(), Millis(42));
        ticks.set(43);
        assert_eq!(clock.now(), Millis(43));
        clock.delay_ms(2);
        assert!(clock.delay.total_ns >= 2_000_000);
    }
}

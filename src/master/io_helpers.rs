// src/master/io_helpers.rs

use super::SyncMaster;
use crate::common::{
    error::ModbusError,
    hal_traits::{BusClock, Rs485Serial},
    pdu::{ReadRequest, MAX_ADU_LEN},
    response::expected_frame_len,
    timing,
};
use core::time::Duration;
use nb::Result as NbResult;

/// Idle spin between two polls of a non-blocking I/O call.
const IO_POLL_INTERVAL_US: u32 = 100;

// Implementation block for I/O related helpers
impl<IF> SyncMaster<IF>
where
    IF: Rs485Serial + BusClock,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, returning the final result or a timeout error.
    pub(super) fn execute_blocking_io_with_timeout<FN, T>(
        &mut self,
        timeout: Duration,
        mut f: FN,
    ) -> Result<T, ModbusError<IF::Error>>
    where
        FN: FnMut(&mut IF) -> NbResult<T, IF::Error>,
    {
        let start_time = self.interface.now();

        loop {
            match f(&mut self.interface) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    if self.interface.now().elapsed_since(start_time) >= timeout {
                        return Err(ModbusError::Timeout);
                    }
                    self.interface.delay_us(IO_POLL_INTERVAL_US);
                }
                Err(nb::Error::Other(e)) => return Err(ModbusError::Io(e)),
            }
        }
    }

    /// Blocks until the bus has been quiet for the inter-poll delay and the
    /// RTU inter-frame silence.
    pub(super) fn wait_for_bus_quiet(&mut self) {
        if let Some(last_end) = self.last_transaction_end {
            let elapsed = self.interface.now().elapsed_since(last_end);
            if let Some(remaining) = self.bus.inter_poll_delay.checked_sub(elapsed) {
                let remaining_ms = u32::try_from(remaining.as_millis()).unwrap_or(u32::MAX);
                if remaining_ms > 0 {
                    trace!("modbus: waiting {=u32}ms before next poll", remaining_ms);
                    self.interface.delay_ms(remaining_ms);
                }
            }
        }

        let silence = timing::frame_silence(self.bus.baud_rate, self.bus.frame);
        self.interface.delay_us(silence.as_micros() as u32);
    }

    /// Throws away whatever is sitting in the receive queue, such as a reply
    /// that arrived after its request timed out. Returns the discarded count.
    pub(super) fn discard_stale_input(&mut self) -> Result<usize, ModbusError<IF::Error>> {
        let mut discarded = 0;
        // Bounded so a babbling transceiver cannot stall the master
        while discarded < MAX_ADU_LEN {
            match self.interface.read_byte() {
                Ok(_) => discarded += 1,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(ModbusError::Io(e)),
            }
        }
        if discarded > 0 {
            trace!("modbus: discarded {=usize} stale rx bytes", discarded);
        }
        Ok(discarded)
    }

    /// Writes a complete request frame and waits for it to leave the port.
    pub(super) fn send_frame(&mut self, frame: &[u8]) -> Result<(), ModbusError<IF::Error>> {
        let char_time = timing::char_time(self.bus.baud_rate, self.bus.frame);
        let write_timeout = char_time * frame.len() as u32 + Duration::from_millis(20);

        for byte in frame {
            self.execute_blocking_io_with_timeout(write_timeout, |iface| iface.write_byte(*byte))?;
        }

        self.execute_blocking_io_with_timeout(write_timeout, |iface| iface.flush())?;
        Ok(())
    }

    /// Reads one response frame into `buffer`.
    ///
    /// The frame length follows from the request until the function code
    /// shows an exception, which shortens it to five bytes. The whole frame
    /// must arrive within `BusConfig::response_timeout`.
    pub(super) fn read_response_frame<'buf>(
        &mut self,
        request: &ReadRequest,
        buffer: &'buf mut [u8],
    ) -> Result<&'buf [u8], ModbusError<IF::Error>> {
        let timeout = self.bus.response_timeout;
        let start_time = self.interface.now();
        let mut bytes_read = 0;

        loop {
            match self.interface.read_byte() {
                Ok(byte) => {
                    if bytes_read >= buffer.len() {
                        return Err(ModbusError::BufferOverflow {
                            needed: bytes_read + 1,
                            got: buffer.len(),
                        });
                    }
                    buffer[bytes_read] = byte;
                    bytes_read += 1;

                    if let Some(expected) = expected_frame_len(request, &buffer[..bytes_read]) {
                        if expected > buffer.len() {
                            return Err(ModbusError::BufferOverflow {
                                needed: expected,
                                got: buffer.len(),
                            });
                        }
                        if bytes_read >= expected {
                            return Ok(&buffer[..bytes_read]);
                        }
                    }
                }
                Err(nb::Error::WouldBlock) => {
                    if self.interface.now().elapsed_since(start_time) >= timeout {
                        return if bytes_read > 0 {
                            Err(ModbusError::InvalidFrame)
                        } else {
                            Err(ModbusError::Timeout)
                        };
                    }
                    self.interface.delay_us(IO_POLL_INTERVAL_US);
                }
                Err(nb::Error::Other(e)) => return Err(ModbusError::Io(e)),
            }
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::super::tests::{with_crc, MockBus, MockCommError};
    use super::*;
    use crate::common::{address::SlaveId, config::BusConfig, timing::Millis};

    fn master() -> SyncMaster<MockBus> {
        SyncMaster::new(MockBus::new(), BusConfig::default())
    }

    #[test]
    fn test_execute_blocking_io_with_timeout() {
        let mut m = master();

        // Ok after a few WouldBlocks
        let mut calls = 0;
        let ok: Result<i32, _> = m.execute_blocking_io_with_timeout(Duration::from_millis(10), |iface| {
            calls += 1;
            iface.advance_time(1_000);
            if calls < 4 { Err(nb::Error::WouldBlock) } else { Ok(123) }
        });
        assert_eq!(ok, Ok(123));
        assert_eq!(calls, 4);

        // Timeout path
        let timed_out: Result<(), _> = m.execute_blocking_io_with_timeout(Duration::from_millis(5), |iface| {
            iface.advance_time(2_000);
            Err(nb::Error::WouldBlock)
        });
        assert!(matches!(timed_out, Err(ModbusError::Timeout)));

        // IO error path
        let io: Result<(), _> = m.execute_blocking_io_with_timeout(Duration::from_millis(10), |_| {
            Err(nb::Error::Other(MockCommError))
        });
        assert!(matches!(io, Err(ModbusError::Io(MockCommError))));
    }

    #[test]
    fn test_read_response_frame_stops_at_expected_len() {
        let mut m = master();
        let reply = with_crc(&[0x05, 0x03, 0x02, 0xAB, 0xCD]);
        m.interface.read_queue.extend(reply.iter().copied());
        // Trailing noise belongs to the next frame and must stay unread
        m.interface.read_queue.push_back(0xEE);

        let req = ReadRequest::holding(SlaveId::new(5).unwrap(), 0, 1).unwrap();
        let mut buffer = [0u8; 32];
        let frame = m.read_response_frame(&req, &mut buffer).unwrap();
        assert_eq!(frame, reply.as_slice());
        assert_eq!(m.interface.read_queue.len(), 1);
    }

    #[test]
    fn test_read_response_frame_timeout_no_data() {
        let mut m = master();
        let req = ReadRequest::holding(SlaveId::new(5).unwrap(), 0, 1).unwrap();
        let mut buffer = [0u8; 32];
        let start = m.interface.now();
        let result = m.read_response_frame(&req, &mut buffer);
        assert!(matches!(result, Err(ModbusError::Timeout)));
        assert!(m.interface.now().elapsed_since(start) >= Duration::from_millis(1000));
    }

    #[test]
    fn test_read_response_frame_buffer_overflow() {
        let mut m = master();
        m.interface.read_queue.extend([0x05, 0x03, 0x14]);
        let req = ReadRequest::holding(SlaveId::new(5).unwrap(), 0, 10).unwrap();
        let mut buffer = [0u8; 8];
        let result = m.read_response_frame(&req, &mut buffer);
        assert!(matches!(result, Err(ModbusError::BufferOverflow { needed: 25, got: 8 })));
    }

    #[test]
    fn test_wait_for_bus_quiet_waits_remaining_delay() {
        let mut m = master();
        m.last_transaction_end = Some(Millis(0));
        m.interface.advance_time(1_000_000);
        m.wait_for_bus_quiet();
        // 2000 ms remaining plus the 9600 baud frame silence
        assert_eq!(m.interface.current_time_us, 3_000_000 + 3_647);
    }

    #[test]
    fn test_discard_stale_input_empties_queue() {
        let mut m = master();
        m.interface.read_queue.extend(with_crc(&[0x01, 0x03, 0x02, 0x00, 0x07]));
        assert_eq!(m.discard_stale_input(), Ok(7));
        assert!(m.interface.read_queue.is_empty());
        assert_eq!(m.discard_stale_input(), Ok(0));
    }

    #[test]
    fn test_discard_stale_input_is_bounded() {
        let mut m = master();
        m.interface.read_queue.extend(core::iter::repeat(0x55).take(MAX_ADU_LEN + 10));
        assert_eq!(m.discard_stale_input(), Ok(MAX_ADU_LEN));
        assert_eq!(m.interface.read_queue.len(), 10);
    }

    #[test]
    fn test_send_frame_writes_all_bytes() {
        let mut m = master();
        m.send_frame(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]).unwrap();
        assert_eq!(m.interface.tx_frames, vec![vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]]);
    }
}

// src/master/mod.rs

mod io_helpers;

use crate::common::{
    config::BusConfig,
    error::ModbusError,
    hal_traits::{BusClock, Rs485Serial},
    pdu::{ReadRequest, Registers, MAX_ADU_LEN},
    response::parse_read_response,
    timing::Millis,
};

/// Modbus RTU master for blocking register reads on an RS-485 bus.
///
/// Keeps track of when the previous transaction ended so that consecutive
/// requests are spaced by at least `BusConfig::inter_poll_delay`.
#[derive(Debug)]
pub struct SyncMaster<IF>
where
    IF: Rs485Serial + BusClock,
{
    interface: IF,
    bus: BusConfig,
    last_transaction_end: Option<Millis>,
}

impl<IF> SyncMaster<IF>
where
    IF: Rs485Serial + BusClock,
{
    pub fn new(interface: IF, bus: BusConfig) -> Self {
        SyncMaster {
            interface,
            bus,
            last_transaction_end: None,
        }
    }

    /// Pushes baud rate and framing to the port.
    pub fn configure(&mut self) -> Result<(), ModbusError<IF::Error>> {
        info!("rs485: {=u32} baud", self.bus.baud_rate);
        self.interface
            .set_config(self.bus.baud_rate, self.bus.frame)
            .map_err(ModbusError::Io)
    }

    pub fn bus_config(&self) -> &BusConfig {
        &self.bus
    }

    pub fn interface(&self) -> &IF {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut IF {
        &mut self.interface
    }

    pub fn release(self) -> IF {
        self.interface
    }

    /// When the most recent transaction finished, successful or not.
    pub fn last_transaction_end(&self) -> Option<Millis> {
        self.last_transaction_end
    }

    // --- Public Blocking Methods ---

    /// Reads a block of registers, retrying transient failures.
    ///
    /// Timeouts, truncated frames and CRC errors are retried up to
    /// `BusConfig::retries` times. Exception responses and I/O errors are
    /// returned straight away.
    pub fn read_registers(&mut self, request: &ReadRequest) -> Result<Registers, ModbusError<IF::Error>> {
        let attempts = u16::from(self.bus.retries) + 1;
        let mut last_error = ModbusError::Timeout;

        for attempt in 0..attempts {
            match self.execute_transaction(request) {
                Ok(registers) => return Ok(registers),
                Err(e) if e.is_retryable() => {
                    debug!(
                        "modbus: slave {=u8} attempt {=u16} failed: {=str}",
                        request.slave().as_u8(),
                        attempt + 1,
                        e.kind()
                    );
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    // --- Core Transaction Logic (Private Helper) ---
    fn execute_transaction(&mut self, request: &ReadRequest) -> Result<Registers, ModbusError<IF::Error>> {
        self.wait_for_bus_quiet();

        let mut read_buffer = [0u8; MAX_ADU_LEN];
        let result = self.exchange(request, &mut read_buffer);

        self.last_transaction_end = Some(self.interface.now());
        result
    }

    fn exchange(
        &mut self,
        request: &ReadRequest,
        read_buffer: &mut [u8],
    ) -> Result<Registers, ModbusError<IF::Error>> {
        let adu = request.encode();
        trace!("modbus: tx {=[u8]}", adu.as_slice());
        self.discard_stale_input()?;
        self.send_frame(&adu)?;
        let frame = self.read_response_frame(request, read_buffer)?;
        parse_read_response(request, frame).map_err(ModbusError::widen)
    }
}

// src/common/pdu.rs

use super::address::SlaveId;
use super::crc::{calculate_crc16, encode_crc};
use super::error::ModbusError;
use arrayvec::ArrayVec;

/// Most registers a single read may request.
pub const MAX_READ_REGISTERS: u16 = 125;
/// Encoded size of a read request ADU.
pub const READ_REQUEST_LEN: usize = 8;
/// Size of an exception response ADU.
pub const EXCEPTION_RESPONSE_LEN: usize = 5;
/// Largest RTU frame on the wire.
pub const MAX_ADU_LEN: usize = 256;

/// Bit set in the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Register values of one successful read.
pub type Registers = ArrayVec<u16, { MAX_READ_REGISTERS as usize }>;

/// Modbus function codes used by the master.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FunctionCode {
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
}

impl FunctionCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Which register table a read targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterKind {
    Holding,
    Input,
}

impl RegisterKind {
    pub const fn function_code(self) -> FunctionCode {
        match self {
            RegisterKind::Holding => FunctionCode::ReadHoldingRegisters,
            RegisterKind::Input => FunctionCode::ReadInputRegisters,
        }
    }
}

/// Exception codes a peripheral may answer with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Other(u8),
}

impl ExceptionCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::ServerDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::ServerDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetFailedToRespond,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::ServerDeviceBusy => 0x06,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetFailedToRespond => 0x0B,
            Self::Other(code) => code,
        }
    }
}

/// A read of `count` consecutive registers starting at `start`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadRequest {
    slave: SlaveId,
    kind: RegisterKind,
    start: u16,
    count: u16,
}

impl ReadRequest {
    /// Validates the register range and builds the request.
    pub fn new(
        slave: SlaveId,
        kind: RegisterKind,
        start: u16,
        count: u16,
    ) -> Result<Self, ModbusError<()>> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(ModbusError::InvalidQuantity(count));
        }
        if u32::from(start) + u32::from(count) - 1 > u32::from(u16::MAX) {
            return Err(ModbusError::AddressOverflow);
        }
        Ok(ReadRequest { slave, kind, start, count })
    }

    pub fn holding(slave: SlaveId, start: u16, count: u16) -> Result<Self, ModbusError<()>> {
        Self::new(slave, RegisterKind::Holding, start, count)
    }

    pub fn input(slave: SlaveId, start: u16, count: u16) -> Result<Self, ModbusError<()>> {
        Self::new(slave, RegisterKind::Input, start, count)
    }

    #[inline]
    pub fn slave(&self) -> SlaveId {
        self.slave
    }

    #[inline]
    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    #[inline]
    pub fn start(&self) -> u16 {
        self.start
    }

    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    #[inline]
    pub fn function_code(&self) -> FunctionCode {
        self.kind.function_code()
    }

    /// Length of the normal (non-exception) response ADU.
    pub fn expected_response_len(&self) -> usize {
        // slave + fc + byte count + data + crc
        3 + 2 * usize::from(self.count) + 2
    }

    /// Encodes the request ADU: slave, function, start, count, CRC.
    pub fn encode(&self) -> ArrayVec<u8, READ_REQUEST_LEN> {
        let mut adu = ArrayVec::new();
        let [start_hi, start_lo] = self.start.to_be_bytes();
        let [count_hi, count_lo] = self.count.to_be_bytes();
        adu.push(self.slave.as_u8());
        adu.push(self.function_code().as_u8());
        adu.push(start_hi);
        adu.push(start_lo);
        adu.push(count_hi);
        adu.push(count_lo);
        let crc = calculate_crc16(&adu);
        for byte in encode_crc(crc) {
            adu.push(byte);
        }
        adu
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn slave(id: u8) -> SlaveId {
        SlaveId::new(id).unwrap()
    }

    #[test]
    fn test_encode_holding_request() {
        let req = ReadRequest::holding(slave(1), 0x0000, 10).unwrap();
        assert_eq!(req.encode().as_slice(), &[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]);
        assert_eq!(req.expected_response_len(), 25);
    }

    #[test]
    fn test_encode_input_request() {
        let req = ReadRequest::input(slave(0x11), 0x0008, 1).unwrap();
        assert_eq!(req.encode().as_slice(), &[0x11, 0x04, 0x00, 0x08, 0x00, 0x01, 0xB2, 0x98]);
        assert_eq!(req.expected_response_len(), 7);
    }

    #[test]
    fn test_quantity_limits() {
        assert!(matches!(
            ReadRequest::holding(slave(1), 0, 0),
            Err(ModbusError::InvalidQuantity(0))
        ));
        assert!(matches!(
            ReadRequest::holding(slave(1), 0, 126),
            Err(ModbusError::InvalidQuantity(126))
        ));
        assert!(ReadRequest::holding(slave(1), 0, 125).is_ok());
    }

    #[test]
    fn test_address_overflow() {
        assert!(ReadRequest::input(slave(1), 0xFFFF, 1).is_ok());
        assert!(matches!(
            ReadRequest::input(slave(1), 0xFFFF, 2),
            Err(ModbusError::AddressOverflow)
        ));
    }

    #[test]
    fn test_exception_code_mapping() {
        assert_eq!(ExceptionCode::from_u8(0x02), ExceptionCode::IllegalDataAddress);
        assert_eq!(ExceptionCode::from_u8(0x0B), ExceptionCode::GatewayTargetFailedToRespond);
        assert_eq!(ExceptionCode::from_u8(0x42), ExceptionCode::Other(0x42));
        assert_eq!(ExceptionCode::Other(0x42).as_u8(), 0x42);
        assert_eq!(ExceptionCode::ServerDeviceBusy.as_u8(), 0x06);
    }
}

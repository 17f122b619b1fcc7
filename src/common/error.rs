// src/common/error.rs

use super::pdu::ExceptionCode;
use core::convert::Infallible;

/// Errors of a Modbus transaction on the RS-485 bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModbusError<E = ()>
where
    E: core::fmt::Debug,
{
    /// Underlying I/O error from the serial port implementation.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// No response arrived before the response timeout.
    #[error("Operation timed out")]
    Timeout,

    /// Response frame is truncated or its length fields are inconsistent.
    #[error("Invalid response frame")]
    InvalidFrame,

    /// Received CRC does not match calculated CRC.
    #[error("CRC mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    CrcMismatch { expected: u16, calculated: u16 },

    /// A well-formed frame from the wrong slave or for the wrong function.
    #[error("Unexpected response received")]
    UnexpectedResponse,

    /// The peripheral answered with a Modbus exception.
    #[error("Exception response: {0:?}")]
    Exception(ExceptionCode),

    /// Response does not fit the receive buffer.
    #[error("Buffer overflow: needed {needed}, got {got}")]
    BufferOverflow { needed: usize, got: usize },

    /// Slave id outside the unicast range 1..=247.
    #[error("Invalid slave id: {0}")]
    InvalidSlaveId(u8),

    /// Register count outside 1..=125.
    #[error("Invalid register quantity: {0}")]
    InvalidQuantity(u16),

    /// `start + count` runs past register 0xFFFF.
    #[error("Register range runs past the end of the address space")]
    AddressOverflow,
}

impl ModbusError<Infallible> {
    /// Lifts an error from pure frame handling into any `ModbusError<E>`.
    pub fn widen<E: core::fmt::Debug>(self) -> ModbusError<E> {
        match self {
            ModbusError::Io(never) => match never {},
            ModbusError::Timeout => ModbusError::Timeout,
            ModbusError::InvalidFrame => ModbusError::InvalidFrame,
            ModbusError::CrcMismatch { expected, calculated } => {
                ModbusError::CrcMismatch { expected, calculated }
            }
            ModbusError::UnexpectedResponse => ModbusError::UnexpectedResponse,
            ModbusError::Exception(code) => ModbusError::Exception(code),
            ModbusError::BufferOverflow { needed, got } => ModbusError::BufferOverflow { needed, got },
            ModbusError::InvalidSlaveId(id) => ModbusError::InvalidSlaveId(id),
            ModbusError::InvalidQuantity(q) => ModbusError::InvalidQuantity(q),
            ModbusError::AddressOverflow => ModbusError::AddressOverflow,
        }
    }
}

impl<E: core::fmt::Debug> ModbusError<E> {
    /// Whether the transaction is worth repeating.
    ///
    /// Line noise and a slow peripheral are transient; an exception or a local
    /// I/O fault will not change on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModbusError::Timeout | ModbusError::InvalidFrame | ModbusError::CrcMismatch { .. }
        )
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ModbusError::Io(_) => "io",
            ModbusError::Timeout => "timeout",
            ModbusError::InvalidFrame => "invalid frame",
            ModbusError::CrcMismatch { .. } => "crc mismatch",
            ModbusError::UnexpectedResponse => "unexpected response",
            ModbusError::Exception(_) => "exception",
            ModbusError::BufferOverflow { .. } => "buffer overflow",
            ModbusError::InvalidSlaveId(_) => "invalid slave id",
            ModbusError::InvalidQuantity(_) => "invalid quantity",
            ModbusError::AddressOverflow => "address overflow",
        }
    }
}

/// Errors on the LoRaWAN side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UplinkError<E = ()>
where
    E: core::fmt::Debug,
{
    /// Error reported by the modem driver.
    #[error("Radio error: {0:?}")]
    Radio(E),

    /// Tried to send before the network join completed.
    #[error("Modem has not joined the network")]
    NotJoined,

    /// Every OTAA join attempt failed.
    #[error("Join failed after {attempts} attempts")]
    JoinFailed { attempts: u8 },

    /// Encoded frame exceeds what the modem accepts at the current data rate.
    #[error("Payload too large: needed {needed}, max {max}")]
    PayloadTooLarge { needed: usize, max: usize },

    /// Application port outside 1..=223.
    #[error("Invalid application port: {0}")]
    InvalidPort(u8),
}

impl UplinkError<Infallible> {
    /// Lifts an error from payload encoding into any `UplinkError<E>`.
    pub fn widen<E: core::fmt::Debug>(self) -> UplinkError<E> {
        match self {
            UplinkError::Radio(never) => match never {},
            UplinkError::NotJoined => UplinkError::NotJoined,
            UplinkError::JoinFailed { attempts } => UplinkError::JoinFailed { attempts },
            UplinkError::PayloadTooLarge { needed, max } => UplinkError::PayloadTooLarge { needed, max },
            UplinkError::InvalidPort(port) => UplinkError::InvalidPort(port),
        }
    }
}

/// Rejected `DeviceConfig` fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Baud rate must be non-zero")]
    ZeroBaudRate,

    #[error("Response timeout must be non-zero")]
    ZeroResponseTimeout,

    #[error("Collection intervals must be non-zero")]
    ZeroCollectionInterval,

    #[error("Daily interval is shorter than the frequent interval")]
    DailyShorterThanFrequent,

    #[error("Invalid uplink port: {0}")]
    InvalidUplinkPort(u8),
}

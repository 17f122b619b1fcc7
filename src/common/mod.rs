// src/common/mod.rs

pub mod address;
pub mod config;
pub mod crc;
pub mod error;
pub mod frame;
#[cfg(feature = "impl-hal")]
pub mod hal_adapter;
pub mod hal_traits;
pub mod pdu;
pub mod response;
pub mod timing;

// --- Re-export key types/traits/functions for easier access ---

pub use address::SlaveId;

pub use config::{BusConfig, CollectionSchedule, DeviceConfig, DeviceProfile, UplinkConfig};

pub use crc::{calculate_crc16, decode_crc, encode_crc, verify_frame_crc};

pub use error::{ConfigError, ModbusError, UplinkError};

pub use frame::FrameFormat;

#[cfg(feature = "impl-hal")]
pub use hal_adapter::{DirectionControlled, DirectionError, HalClock};

pub use hal_traits::{BusClock, LoraModem, Rs485Serial};

pub use pdu::{ExceptionCode, FunctionCode, ReadRequest, RegisterKind, Registers};

pub use response::parse_read_response;

pub use timing::{Millis, MODBUS_DELAY, RS485_BAUDRATE};

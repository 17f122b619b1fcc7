// src/lib.rs

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

pub mod common;
pub mod device;
pub mod master;
pub mod uplink;

// Re-export key types for convenience
pub use common::{DeviceConfig, DeviceProfile, Millis, ModbusError, SlaveId, UplinkError};
pub use device::{Controller, DeviceContext};
pub use master::SyncMaster;

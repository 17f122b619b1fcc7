// src/common/address.rs

use super::error::ModbusError;
use core::convert::TryFrom;
use core::fmt;

/// Unicast address of a Modbus peripheral (1..=247).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveId(u8);

impl SlaveId {
    pub const BROADCAST: u8 = 0;
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 247;

    /// Creates a new `SlaveId` if `id` is a unicast address.
    ///
    /// Broadcast (0) is rejected: a broadcast request gets no reply, so it can
    /// never be used for a read. 248..=255 are reserved.
    pub fn new(id: u8) -> Result<Self, ModbusError<()>> {
        if Self::is_unicast(id) {
            Ok(SlaveId(id))
        } else {
            Err(ModbusError::InvalidSlaveId(id))
        }
    }

    #[inline]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_unicast(id: u8) -> bool {
        matches!(id, Self::MIN..=Self::MAX)
    }
}

impl TryFrom<u8> for SlaveId {
    type Error = ModbusError<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlaveId> for u8 {
    fn from(value: SlaveId) -> Self {
        value.0
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// src/common/config.rs

use super::error::ConfigError;
use super::frame::FrameFormat;
use super::timing::{
    DAILY_COLLECTION_INTERVAL, FREQUENT_COLLECTION_INTERVAL, MODBUS_DELAY, RESPONSE_TIMEOUT,
    RS485_BAUDRATE,
};
use crate::uplink::session::Region;
use core::time::Duration;

/// Hardware variant of the control unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceProfile {
    /// Collects on a frequent and a daily cadence.
    TerisDevice,
    /// Collects on every loop cycle.
    RenzettiHouse,
}

impl DeviceProfile {
    /// Identifier carried in uplink frames.
    pub const fn id(self) -> u8 {
        match self {
            DeviceProfile::TerisDevice => 1,
            DeviceProfile::RenzettiHouse => 2,
        }
    }
}

/// RS-485 / Modbus RTU settings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusConfig {
    /// Must equal the rate configured on every peripheral.
    pub baud_rate: u32,
    pub frame: FrameFormat,
    /// Minimum quiet time between two transactions.
    pub inter_poll_delay: Duration,
    pub response_timeout: Duration,
    /// Extra attempts after a retryable failure.
    pub retries: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            baud_rate: RS485_BAUDRATE,
            frame: FrameFormat::Rtu8N1,
            inter_poll_delay: MODBUS_DELAY,
            response_timeout: RESPONSE_TIMEOUT,
            retries: 1,
        }
    }
}

/// Spacing of the two collection cadences.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CollectionSchedule {
    pub frequent_interval: Duration,
    pub daily_interval: Duration,
}

impl Default for CollectionSchedule {
    fn default() -> Self {
        CollectionSchedule {
            frequent_interval: FREQUENT_COLLECTION_INTERVAL,
            daily_interval: DAILY_COLLECTION_INTERVAL,
        }
    }
}

/// LoRaWAN uplink settings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UplinkConfig {
    pub region: Region,
    /// Application port, 1..=223.
    pub port: u8,
    pub confirmed: bool,
    pub join_attempts: u8,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        UplinkConfig {
            region: Region::Eu868,
            port: 1,
            confirmed: false,
            join_attempts: 3,
        }
    }
}

/// Complete configuration of one control unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceConfig {
    pub profile: DeviceProfile,
    pub bus: BusConfig,
    /// `None` collects on every loop cycle.
    pub schedule: Option<CollectionSchedule>,
    pub uplink: UplinkConfig,
}

impl DeviceConfig {
    /// Factory settings of a hardware variant.
    pub fn for_profile(profile: DeviceProfile) -> Self {
        let schedule = match profile {
            DeviceProfile::TerisDevice => Some(CollectionSchedule::default()),
            DeviceProfile::RenzettiHouse => None,
        };
        DeviceConfig {
            profile,
            bus: BusConfig::default(),
            schedule,
            uplink: UplinkConfig::default(),
        }
    }

    pub fn with_bus(mut self, bus: BusConfig) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.bus.baud_rate = baud_rate;
        self
    }

    pub fn with_inter_poll_delay(mut self, delay: Duration) -> Self {
        self.bus.inter_poll_delay = delay;
        self
    }

    pub fn with_schedule(mut self, schedule: Option<CollectionSchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_uplink(mut self, uplink: UplinkConfig) -> Self {
        self.uplink = uplink;
        self
    }

    /// Checks the values nothing else on the device can correct at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        if self.bus.response_timeout.is_zero() {
            return Err(ConfigError::ZeroResponseTimeout);
        }
        if let Some(schedule) = &self.schedule {
            if schedule.frequent_interval.is_zero() || schedule.daily_interval.is_zero() {
                return Err(ConfigError::ZeroCollectionInterval);
            }
            if schedule.daily_interval < schedule.frequent_interval {
                return Err(ConfigError::DailyShorterThanFrequent);
            }
        }
        if !matches!(self.uplink.port, 1..=223) {
            return Err(ConfigError::InvalidUplinkPort(self.uplink.port));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::for_profile(DeviceProfile::TerisDevice)
    }
}

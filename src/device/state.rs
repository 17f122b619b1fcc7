// src/device/state.rs

use crate::common::{config::CollectionSchedule, error::ModbusError, timing::Millis};
use crate::uplink::payload::{FLAG_DAILY, FLAG_EVERY_CYCLE, FLAG_FREQUENT};
use core::fmt::Debug;
use core::time::Duration;

// --- Error accounting ---

/// Outcome bookkeeping of the Modbus reads in one loop cycle.
///
/// `flag` mirrors the last read (set on failure, cleared on success);
/// `total` counts failures since the cycle began.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ErrorTally {
    flag: bool,
    total: u16,
}

impl ErrorTally {
    pub const fn new() -> Self {
        ErrorTally { flag: false, total: 0 }
    }

    /// Whether the most recent read failed.
    #[inline]
    pub fn flag(&self) -> bool {
        self.flag
    }

    /// Failed reads in the current cycle.
    #[inline]
    pub fn total(&self) -> u16 {
        self.total
    }

    pub fn record_success(&mut self) {
        self.flag = false;
    }

    pub fn record_failure(&mut self) {
        self.flag = true;
        self.total = self.total.saturating_add(1);
    }

    pub fn record<T, E: Debug>(&mut self, result: &Result<T, ModbusError<E>>) {
        match result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
    }

    /// Starts a new loop cycle.
    pub fn begin_cycle(&mut self) {
        *self = Self::new();
    }
}

// --- Collection scheduling ---

/// How often a sensor read runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cadence {
    /// Every loop cycle that collects anything.
    EveryCycle,
    Frequent,
    Daily,
}

/// Which cadences are due in this cycle.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Due {
    pub frequent: bool,
    pub daily: bool,
}

impl Due {
    pub const NONE: Due = Due { frequent: false, daily: false };
    pub const ALL: Due = Due { frequent: true, daily: true };

    pub fn any(&self) -> bool {
        self.frequent || self.daily
    }

    pub fn includes(&self, cadence: Cadence) -> bool {
        match cadence {
            Cadence::EveryCycle => true,
            Cadence::Frequent => self.frequent,
            Cadence::Daily => self.daily,
        }
    }

    /// Cadence flags for the uplink header.
    pub fn flags(&self) -> u8 {
        let mut flags = FLAG_EVERY_CYCLE;
        if self.frequent {
            flags |= FLAG_FREQUENT;
        }
        if self.daily {
            flags |= FLAG_DAILY;
        }
        flags
    }
}

/// When each cadence last completed a collection.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CollectionTimestamps {
    last_frequent: Option<Millis>,
    last_daily: Option<Millis>,
}

impl CollectionTimestamps {
    pub const fn new() -> Self {
        CollectionTimestamps { last_frequent: None, last_daily: None }
    }

    pub fn last_frequent(&self) -> Option<Millis> {
        self.last_frequent
    }

    pub fn last_daily(&self) -> Option<Millis> {
        self.last_daily
    }

    /// Cadences whose interval has run out at `now`. A cadence that has
    /// never collected is due straight away.
    pub fn due(&self, now: Millis, schedule: &CollectionSchedule) -> Due {
        let is_due = |last: Option<Millis>, interval: Duration| match last {
            None => true,
            Some(last) => now.elapsed_since(last) >= interval,
        };
        Due {
            frequent: is_due(self.last_frequent, schedule.frequent_interval),
            daily: is_due(self.last_daily, schedule.daily_interval),
        }
    }

    pub fn mark_frequent(&mut self, now: Millis) {
        self.last_frequent = Some(now);
    }

    pub fn mark_daily(&mut self, now: Millis) {
        self.last_daily = Some(now);
    }

    /// Marks every cadence in `due` as collected at `now`.
    pub fn mark(&mut self, due: Due, now: Millis) {
        if due.frequent {
            self.mark_frequent(now);
        }
        if due.daily {
            self.mark_daily(now);
        }
    }
}

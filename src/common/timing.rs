// src/common/timing.rs

use super::frame::FrameFormat;
use core::fmt;
use core::time::Duration;

// === Bus Configuration ===

/// Baud rate of the RS-485 bus.
///
/// Every peripheral on the bus must be configured with the same rate; nothing
/// on the master side can detect a mismatch other than reads timing out.
pub const RS485_BAUDRATE: u32 = 9600;

/// Quiet time between the end of one Modbus transaction and the start of the next.
///
/// Gives the addressed device time to finish its reply before the next request
/// goes out. Tune it against the real bus: if shortening it makes reads start
/// to time out, it has to go back up.
pub const MODBUS_DELAY: Duration = Duration::from_millis(3000);

/// How long the master waits for a complete response frame.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Above this rate the RTU inter-frame gap is a fixed 1.75 ms.
pub const FIXED_SILENCE_BAUD_THRESHOLD: u32 = 19_200;
pub const FIXED_FRAME_SILENCE: Duration = Duration::from_micros(1750);

// === Collection Cadence ===

/// Default spacing of the frequent collection.
pub const FREQUENT_COLLECTION_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Default spacing of the daily collection.
pub const DAILY_COLLECTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

// === Radio ===

/// Back-off between two OTAA join attempts.
pub const JOIN_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Duration of one character on the wire.
pub fn char_time(baud: u32, frame: FrameFormat) -> Duration {
    let baud = u64::from(baud.max(1));
    let bits = u64::from(frame.bits_per_char());
    Duration::from_micros((bits * 1_000_000).div_ceil(baud))
}

/// Minimum silence that delimits two RTU frames (3.5 character times).
pub fn frame_silence(baud: u32, frame: FrameFormat) -> Duration {
    if baud > FIXED_SILENCE_BAUD_THRESHOLD {
        FIXED_FRAME_SILENCE
    } else {
        char_time(baud, frame) * 7 / 2
    }
}

// === Millisecond Tick ===

/// Millisecond tick of a free-running 32-bit counter.
///
/// The counter wraps after about 49.7 days. Elapsed time is computed with
/// wrapping subtraction, so it stays correct across one wrap.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Millis(pub u32);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`.
    #[inline]
    pub fn elapsed_since(self, earlier: Millis) -> Duration {
        Duration::from_millis(u64::from(self.0.wrapping_sub(earlier.0)))
    }

    /// Tick `duration` after `self`, wrapping. Durations beyond `u32::MAX` ms are clamped.
    #[inline]
    pub fn wrapping_add(self, duration: Duration) -> Millis {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        Millis(self.0.wrapping_add(ms))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Millis {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u32}ms", self.0)
    }
}

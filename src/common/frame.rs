// src/common/frame.rs

/// Serial character framing used on the RS-485 bus.
///
/// Modbus RTU always sends 8 data bits; the variants differ in parity and stop bits.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameFormat {
    /// 8 data bits, no parity, 1 stop bit.
    #[default]
    Rtu8N1,
    /// 8 data bits, even parity, 1 stop bit (the Modbus default).
    Rtu8E1,
    /// 8 data bits, odd parity, 1 stop bit.
    Rtu8O1,
    /// 8 data bits, no parity, 2 stop bits.
    Rtu8N2,
}

impl FrameFormat {
    /// Bits on the wire per character, start bit included.
    pub const fn bits_per_char(self) -> u32 {
        match self {
            FrameFormat::Rtu8N1 => 10,
            FrameFormat::Rtu8E1 | FrameFormat::Rtu8O1 | FrameFormat::Rtu8N2 => 11,
        }
    }
}

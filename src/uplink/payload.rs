// src/uplink/payload.rs

use crate::common::{
    error::UplinkError,
    pdu::{ReadRequest, Registers},
};
use arrayvec::ArrayVec;
use core::convert::Infallible;

/// Largest LoRaWAN application payload any region allows.
pub const MAX_UPLINK_LEN: usize = 242;

/// Layout version written in the first byte.
pub const FORMAT_VERSION: u8 = 0x01;

/// Header bytes before the first reading block.
pub const HEADER_LEN: usize = 6;

/// Block bytes besides the register values: slave, function, start (2), count.
pub const BLOCK_OVERHEAD: usize = 5;

// Cadence flags (header byte 2)
pub const FLAG_EVERY_CYCLE: u8 = 0x01;
pub const FLAG_FREQUENT: u8 = 0x02;
pub const FLAG_DAILY: u8 = 0x04;

/// Registers read from one peripheral during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub request: ReadRequest,
    pub registers: Registers,
}

impl Reading {
    fn encoded_len(&self) -> usize {
        BLOCK_OVERHEAD + 2 * self.registers.len()
    }
}

/// Fixed part of an uplink frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameHeader {
    pub profile: u8,
    pub cadence_flags: u8,
    /// Failed Modbus reads in the cycle.
    pub error_total: u16,
}

/// Encoded uplink frame.
///
/// ```text
/// 0      version
/// 1      device profile
/// 2      cadence flags
/// 3..5   error total (BE)
/// 5      block count n
/// then n blocks: slave, function, start (BE), count, count x u16 (BE)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkPayload {
    bytes: ArrayVec<u8, MAX_UPLINK_LEN>,
}

impl UplinkPayload {
    /// Encodes a frame no longer than `max_len` bytes.
    ///
    /// Either the whole frame fits or `PayloadTooLarge` is returned; readings
    /// are never silently dropped.
    pub fn encode(header: FrameHeader, readings: &[Reading], max_len: usize) -> Result<Self, UplinkError<Infallible>> {
        let limit = max_len.min(MAX_UPLINK_LEN);
        let needed = Self::encoded_len(readings);
        if needed > limit || readings.len() > usize::from(u8::MAX) {
            return Err(UplinkError::PayloadTooLarge { needed, max: limit });
        }

        let mut bytes = ArrayVec::new();
        bytes.push(FORMAT_VERSION);
        bytes.push(header.profile);
        bytes.push(header.cadence_flags);
        bytes.extend(header.error_total.to_be_bytes());
        bytes.push(readings.len() as u8);

        for reading in readings {
            let request = &reading.request;
            bytes.push(request.slave().as_u8());
            bytes.push(request.function_code().as_u8());
            bytes.extend(request.start().to_be_bytes());
            bytes.push(reading.registers.len() as u8);
            for value in &reading.registers {
                bytes.extend(value.to_be_bytes());
            }
        }

        Ok(UplinkPayload { bytes })
    }

    /// Size the frame for `readings` would have.
    pub fn encoded_len(readings: &[Reading]) -> usize {
        HEADER_LEN + readings.iter().map(Reading::encoded_len).sum::<usize>()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::address::SlaveId;

    fn reading(slave: u8, input: bool, start: u16, values: &[u16]) -> Reading {
        let slave = SlaveId::new(slave).unwrap();
        let count = values.len() as u16;
        let request = if input {
            ReadRequest::input(slave, start, count).unwrap()
        } else {
            ReadRequest::holding(slave, start, count).unwrap()
        };
        Reading { request, registers: values.iter().copied().collect() }
    }

    fn header(errors: u16) -> FrameHeader {
        FrameHeader { profile: 1, cadence_flags: FLAG_FREQUENT, error_total: errors }
    }

    #[test]
    fn test_header_only() {
        let p = UplinkPayload::encode(header(0x0102), &[], 51).unwrap();
        assert_eq!(p.as_bytes(), &[FORMAT_VERSION, 1, FLAG_FREQUENT, 0x01, 0x02, 0]);
    }

    #[test]
    fn test_blocks_layout() {
        let readings = [
            reading(3, false, 0x0100, &[0x1234, 0xABCD]),
            reading(7, true, 0x0002, &[0x0005]),
        ];
        let p = UplinkPayload::encode(header(1), &readings, 51).unwrap();
        assert_eq!(
            p.as_bytes(),
            &[
                FORMAT_VERSION, 1, FLAG_FREQUENT, 0x00, 0x01, 2,
                3, 0x03, 0x01, 0x00, 2, 0x12, 0x34, 0xAB, 0xCD,
                7, 0x04, 0x00, 0x02, 1, 0x00, 0x05,
            ]
        );
        assert_eq!(p.len(), UplinkPayload::encoded_len(&readings));
    }

    #[test]
    fn test_too_large_for_data_rate() {
        // 6 + 5 + 2 * 21 = 53 > 51
        let values = [0u16; 21];
        let readings = [reading(1, false, 0, &values)];
        let result = UplinkPayload::encode(header(0), &readings, 51);
        assert_eq!(result, Err(UplinkError::PayloadTooLarge { needed: 53, max: 51 }));
        assert!(UplinkPayload::encode(header(0), &readings, 53).is_ok());
    }

    #[test]
    fn test_limit_capped_at_protocol_max() {
        let values = [0u16; 125];
        let readings = [reading(1, false, 0, &values)];
        let result = UplinkPayload::encode(header(0), &readings, 1000);
        assert_eq!(result, Err(UplinkError::PayloadTooLarge { needed: 261, max: MAX_UPLINK_LEN }));
    }
}

// src/common/crc.rs

use super::error::ModbusError;
use crc::{Crc, CRC_16_MODBUS};

// Create a Crc instance for the Modbus algorithm for reuse.
const CRC_COMPUTER: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Length of the CRC trailer of an RTU frame.
pub const CRC_LEN: usize = 2;

/// Calculates the Modbus RTU CRC-16 for the given bytes.
///
/// CRC-16/MODBUS: polynomial 0x8005 reflected, initial value 0xFFFF,
/// no final XOR. Covers every byte from the slave id up to, but not
/// including, the CRC itself.
#[inline]
pub fn calculate_crc16(data: &[u8]) -> u16 {
    CRC_COMPUTER.checksum(data)
}

/// Encodes a CRC the way it travels on the wire: low byte first.
pub fn encode_crc(crc_value: u16) -> [u8; CRC_LEN] {
    crc_value.to_le_bytes()
}

/// Decodes a two-byte wire CRC (low byte first).
///
/// # Panics
///
/// Panics if `crc_bytes` does not have a length of exactly 2.
pub fn decode_crc(crc_bytes: &[u8]) -> u16 {
    assert_eq!(crc_bytes.len(), CRC_LEN, "RTU CRC must be 2 bytes long");
    u16::from_le_bytes([crc_bytes[0], crc_bytes[1]])
}

/// Verifies a complete RTU frame whose last two bytes are the CRC.
///
/// # Returns
///
/// * `Ok(())` if the CRC is valid.
/// * `Err(ModbusError::InvalidFrame)` if the buffer cannot hold a CRC.
/// * `Err(ModbusError::CrcMismatch)` if the CRCs don't match.
pub fn verify_frame_crc<E>(frame: &[u8]) -> Result<(), ModbusError<E>>
where
    E: core::fmt::Debug,
{
    if frame.len() <= CRC_LEN {
        return Err(ModbusError::InvalidFrame);
    }
    let data_len = frame.len() - CRC_LEN;
    let calculated = calculate_crc16(&frame[..data_len]);
    let received = decode_crc(&frame[data_len..]);

    if calculated == received {
        Ok(())
    } else {
        Err(ModbusError::CrcMismatch { expected: received, calculated })
    }
}

// src/common/response.rs

use super::crc::verify_frame_crc;
use super::error::ModbusError;
use super::pdu::{ExceptionCode, ReadRequest, Registers, EXCEPTION_FLAG, EXCEPTION_RESPONSE_LEN};
use core::convert::Infallible;

/// Parses the response ADU of a register read.
///
/// The frame must be complete, CRC included. Checks run in wire order:
/// length, CRC, slave id, function code (or exception), byte count.
pub fn parse_read_response(request: &ReadRequest, frame: &[u8]) -> Result<Registers, ModbusError<Infallible>> {
    if frame.len() < EXCEPTION_RESPONSE_LEN {
        return Err(ModbusError::InvalidFrame);
    }

    verify_frame_crc(frame)?;

    if frame[0] != request.slave().as_u8() {
        return Err(ModbusError::UnexpectedResponse);
    }

    let function = frame[1];
    let expected_fc = request.function_code().as_u8();
    if function == expected_fc | EXCEPTION_FLAG {
        return Err(ModbusError::Exception(ExceptionCode::from_u8(frame[2])));
    }
    if function != expected_fc {
        return Err(ModbusError::UnexpectedResponse);
    }

    let byte_count = usize::from(frame[2]);
    let data = &frame[3..frame.len() - 2];
    if byte_count != 2 * usize::from(request.count()) || byte_count != data.len() {
        return Err(ModbusError::InvalidFrame);
    }

    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Length the full frame will have, judged from the bytes received so far.
///
/// `None` until the function code has arrived.
pub fn expected_frame_len(request: &ReadRequest, received: &[u8]) -> Option<usize> {
    let function = *received.get(1)?;
    if function & EXCEPTION_FLAG != 0 {
        Some(EXCEPTION_RESPONSE_LEN)
    } else {
        Some(request.expected_response_len())
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::address::SlaveId;
    use crate::common::crc::{calculate_crc16, encode_crc};

    fn with_crc(data: &[u8]) -> Vec<u8> {
        let mut frame = data.to_vec();
        frame.extend_from_slice(&encode_crc(calculate_crc16(data)));
        frame
    }

    fn holding(slave: u8, start: u16, count: u16) -> ReadRequest {
        ReadRequest::holding(SlaveId::new(slave).unwrap(), start, count).unwrap()
    }

    #[test]
    fn test_parse_holding_response() {
        let req = holding(1, 0x006B, 3);
        let frame = with_crc(&[0x01, 0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64]);
        let regs = parse_read_response(&req, &frame).unwrap();
        assert_eq!(regs.as_slice(), &[0x022B, 0x0000, 0x0064]);
    }

    #[test]
    fn test_parse_input_response_published_frame() {
        // 11 04 02 00 0A F8 F4
        let req = ReadRequest::input(SlaveId::new(0x11).unwrap(), 0x0008, 1).unwrap();
        let frame = [0x11, 0x04, 0x02, 0x00, 0x0A, 0xF8, 0xF4];
        let regs = parse_read_response(&req, &frame).unwrap();
        assert_eq!(regs.as_slice(), &[0x000A]);
    }

    #[test]
    fn test_parse_exception() {
        let req = holding(1, 0x1000, 2);
        let frame = with_crc(&[0x01, 0x83, 0x02]);
        assert!(matches!(
            parse_read_response(&req, &frame),
            Err(ModbusError::Exception(ExceptionCode::IllegalDataAddress))
        ));
    }

    #[test]
    fn test_parse_wrong_slave() {
        let req = holding(1, 0, 1);
        let frame = with_crc(&[0x02, 0x03, 0x02, 0x00, 0x01]);
        assert!(matches!(parse_read_response(&req, &frame), Err(ModbusError::UnexpectedResponse)));
    }

    #[test]
    fn test_parse_wrong_function() {
        let req = holding(1, 0, 1);
        let frame = with_crc(&[0x01, 0x04, 0x02, 0x00, 0x01]);
        assert!(matches!(parse_read_response(&req, &frame), Err(ModbusError::UnexpectedResponse)));
    }

    #[test]
    fn test_parse_byte_count_mismatch() {
        let req = holding(1, 0, 2);
        // Claims 4 bytes, carries 2
        let frame = with_crc(&[0x01, 0x03, 0x04, 0x00, 0x01]);
        assert!(matches!(parse_read_response(&req, &frame), Err(ModbusError::InvalidFrame)));
        // Consistent with itself, but not what was asked for
        let frame = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x01]);
        assert!(matches!(parse_read_response(&req, &frame), Err(ModbusError::InvalidFrame)));
    }

    #[test]
    fn test_parse_bad_crc_and_short() {
        let req = holding(1, 0, 1);
        let mut frame = with_crc(&[0x01, 0x03, 0x02, 0x00, 0x01]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert!(matches!(parse_read_response(&req, &frame), Err(ModbusError::CrcMismatch { .. })));
        assert!(matches!(parse_read_response(&req, &[0x01, 0x03, 0x02]), Err(ModbusError::InvalidFrame)));
    }

    #[test]
    fn test_expected_frame_len() {
        let req = holding(1, 0, 4);
        assert_eq!(expected_frame_len(&req, &[0x01]), None);
        assert_eq!(expected_frame_len(&req, &[0x01, 0x03]), Some(13));
        assert_eq!(expected_frame_len(&req, &[0x01, 0x83]), Some(5));
    }
}

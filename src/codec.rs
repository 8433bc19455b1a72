//! # Modbus TCP ADU Codec
//!
//! Pure encoding and decoding of Modbus TCP frames. No I/O happens here.
//!
//! ## Frame Layout
//!
//! | Offset | Field | Size |
//! |--------|-------|------|
//! | 0 | Transaction ID | u16 BE |
//! | 2 | Protocol ID (0) | u16 BE |
//! | 4 | Length (unit id + PDU) | u16 BE |
//! | 6 | Unit ID | u8 |
//! | 7 | Function Code | u8 |
//! | 8.. | Function payload | - |

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{
    FC_READ_HOLDING_REGISTERS, MBAP_HEADER_LEN, MODBUS_PROTOCOL_ID, READ_REQUEST_PAYLOAD_LEN,
};
use crate::error::{DecodeError, ModbusResult};
use crate::pdu::{ModbusPdu, PduBuilder};
use crate::protocol::{
    ExceptionCode, MbapHeader, Request, RequestPdu, Response, ResponseBody, UnitId,
};

/// Modbus TCP frame codec.
pub struct AduCodec;

impl AduCodec {
    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode one complete request frame.
    ///
    /// Checks run in a fixed order: header size, protocol id, length field
    /// against the bytes actually present, then the function payload. Unknown
    /// function codes decode successfully as [`RequestPdu::Unsupported`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use modbus_clock::{AduCodec, RequestPdu};
    ///
    /// let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x06];
    /// let request = AduCodec::decode(&frame).unwrap();
    /// assert_eq!(request.transaction_id, 1);
    /// assert_eq!(
    ///     request.pdu,
    ///     RequestPdu::ReadHoldingRegisters { start_address: 0, quantity: 6 }
    /// );
    /// ```
    pub fn decode(frame: &[u8]) -> Result<Request, DecodeError> {
        let header = MbapHeader::parse(frame)?;

        if header.protocol_id != MODBUS_PROTOCOL_ID {
            return Err(DecodeError::BadProtocolId(header.protocol_id));
        }

        // Length counts the unit id, which is already part of the header
        let pdu = &frame[MBAP_HEADER_LEN..];
        if header.length as usize != 1 + pdu.len() {
            return Err(DecodeError::LengthMismatch {
                declared: header.length,
                actual: 1 + pdu.len(),
            });
        }

        let (&function_code, payload) = pdu.split_first().ok_or(DecodeError::Truncated {
            expected: MBAP_HEADER_LEN + 1,
            actual: frame.len(),
        })?;

        let pdu = match function_code {
            FC_READ_HOLDING_REGISTERS => {
                if payload.len() != READ_REQUEST_PAYLOAD_LEN {
                    return Err(DecodeError::Truncated {
                        expected: MBAP_HEADER_LEN + 1 + READ_REQUEST_PAYLOAD_LEN,
                        actual: frame.len(),
                    });
                }
                RequestPdu::ReadHoldingRegisters {
                    start_address: u16::from_be_bytes([payload[0], payload[1]]),
                    quantity: u16::from_be_bytes([payload[2], payload[3]]),
                }
            }
            other => RequestPdu::Unsupported {
                function_code: other,
            },
        };

        Ok(Request {
            transaction_id: header.transaction_id,
            unit_id: header.unit_id,
            pdu,
        })
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode a successful register read.
    ///
    /// MBAP length = 1 (unit id) + 1 (function code) + 1 (byte count) + 2 × N.
    pub fn encode_success(
        transaction_id: u16,
        unit_id: UnitId,
        function_code: u8,
        registers: &[u16],
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_read_response(function_code, registers)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// Encode an exception reply: `function_code | 0x80` followed by the code.
    ///
    /// MBAP length is always 3.
    pub fn encode_exception(
        transaction_id: u16,
        unit_id: UnitId,
        function_code: u8,
        code: ExceptionCode,
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_exception(function_code, code)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// Encode a handler response
    pub fn encode_response(response: &Response) -> ModbusResult<Bytes> {
        match &response.body {
            ResponseBody::Success(registers) => Self::encode_success(
                response.transaction_id,
                response.unit_id,
                response.function_code,
                registers,
            ),
            ResponseBody::Exception(code) => Self::encode_exception(
                response.transaction_id,
                response.unit_id,
                response.function_code,
                *code,
            ),
        }
    }

    /// Encode a Read Holding Registers request, as a master would send it.
    ///
    /// The server never sends requests; this exists to drive it from tests,
    /// benches and the fuzz target.
    pub fn encode_read_request(
        transaction_id: u16,
        unit_id: UnitId,
        start_address: u16,
        quantity: u16,
    ) -> ModbusResult<Bytes> {
        let pdu = PduBuilder::build_read_request(start_address, quantity)?;
        Ok(Self::frame(transaction_id, unit_id, &pdu))
    }

    /// Prefix a PDU with its MBAP header
    fn frame(transaction_id: u16, unit_id: UnitId, pdu: &ModbusPdu) -> Bytes {
        let mut buf = BytesMut::with_capacity(MBAP_HEADER_LEN + pdu.len());
        buf.put_u16(transaction_id);
        buf.put_u16(MODBUS_PROTOCOL_ID);
        // PDU is bounded by MAX_PDU_SIZE, so this never truncates
        buf.put_u16((1 + pdu.len()) as u16);
        buf.put_u8(unit_id);
        buf.put_slice(pdu.as_slice());
        buf.freeze()
    }
}

/// Format raw bytes as an uppercase, space-separated hex string
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const READ_ALL: [u8; 12] = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x06,
    ];

    #[test]
    fn test_decode_read_holding_registers() {
        let request = AduCodec::decode(&READ_ALL).unwrap();
        assert_eq!(request.transaction_id, 1);
        assert_eq!(request.unit_id, 1);
        assert_eq!(request.function_code(), 0x03);
        assert_eq!(
            request.pdu,
            RequestPdu::ReadHoldingRegisters {
                start_address: 0,
                quantity: 6
            }
        );
    }

    #[test]
    fn test_decode_short_header() {
        assert_eq!(
            AduCodec::decode(&READ_ALL[..6]),
            Err(DecodeError::Truncated {
                expected: 7,
                actual: 6
            })
        );
        assert!(matches!(
            AduCodec::decode(&[]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_bad_protocol_id() {
        let mut frame = READ_ALL;
        frame[3] = 0x01;
        assert_eq!(AduCodec::decode(&frame), Err(DecodeError::BadProtocolId(1)));
    }

    #[test]
    fn test_decode_length_mismatch() {
        // Declared 6, only 5 bytes follow the length field
        assert_eq!(
            AduCodec::decode(&READ_ALL[..11]),
            Err(DecodeError::LengthMismatch {
                declared: 6,
                actual: 5
            })
        );

        // Declared 6, 7 bytes follow
        let mut frame = READ_ALL.to_vec();
        frame.push(0x00);
        assert_eq!(
            AduCodec::decode(&frame),
            Err(DecodeError::LengthMismatch {
                declared: 6,
                actual: 7
            })
        );
    }

    #[test]
    fn test_decode_missing_function_code() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01];
        assert_eq!(
            AduCodec::decode(&frame),
            Err(DecodeError::Truncated {
                expected: 8,
                actual: 7
            })
        );
    }

    #[test]
    fn test_decode_read_request_wrong_payload_size() {
        // FC03 with only a start address
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x04, 0x01, 0x03, 0x00, 0x00];
        assert!(matches!(
            AduCodec::decode(&frame),
            Err(DecodeError::Truncated { expected: 12, .. })
        ));

        // FC03 with a trailing extra byte, length consistent
        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x00, 0x00, 0x00, 0x06, 0xFF,
        ];
        assert!(matches!(
            AduCodec::decode(&frame),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_unsupported_function_is_not_an_error() {
        let frame = [
            0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x09, 0x04, 0x00, 0x00, 0x00, 0x01,
        ];
        let request = AduCodec::decode(&frame).unwrap();
        assert_eq!(request.transaction_id, 7);
        assert_eq!(request.unit_id, 9);
        assert_eq!(
            request.pdu,
            RequestPdu::Unsupported {
                function_code: 0x04
            }
        );

        // Bare function code with no payload
        let frame = [0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x01, 0x2B];
        let request = AduCodec::decode(&frame).unwrap();
        assert_eq!(request.function_code(), 0x2B);
    }

    #[test]
    fn test_encode_success() {
        let bytes =
            AduCodec::encode_success(1, 1, 0x03, &[15, 6, 2025, 10, 30, 45]).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x01, 0x00, 0x00, 0x00, 0x0F, 0x01, 0x03, 0x0C, 0x00, 0x0F, 0x00, 0x06,
                0x07, 0xE9, 0x00, 0x0A, 0x00, 0x1E, 0x00, 0x2D
            ]
        );
        // Length counts unit id + function code + byte count + 12 data bytes
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]) as usize, bytes.len() - 6);
    }

    #[test]
    fn test_encode_success_single_register() {
        let bytes = AduCodec::encode_success(0xABCD, 0xFF, 0x03, &[0x1234]).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0xAB, 0xCD, 0x00, 0x00, 0x00, 0x05, 0xFF, 0x03, 0x02, 0x12, 0x34]
        );
    }

    #[test]
    fn test_encode_exception() {
        let bytes =
            AduCodec::encode_exception(0x0102, 0x11, 0x04, ExceptionCode::IllegalFunction)
                .unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[0x01, 0x02, 0x00, 0x00, 0x00, 0x03, 0x11, 0x84, 0x01]
        );
    }

    #[test]
    fn test_encode_response_dispatches_on_body() {
        let request = Request::read_holding_registers(3, 1, 0, 0);
        let response = Response::exception(&request, ExceptionCode::IllegalDataValue);
        let bytes = AduCodec::encode_response(&response).unwrap();
        assert_eq!(&bytes[7..], &[0x83, 0x03]);

        let response = Response::success(&request, vec![1, 2]);
        let bytes = AduCodec::encode_response(&response).unwrap();
        assert_eq!(&bytes[7..], &[0x03, 0x04, 0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_encode_read_request_decodes_back() {
        let bytes = AduCodec::encode_read_request(1, 1, 0, 6).unwrap();
        assert_eq!(bytes.as_ref(), &READ_ALL);
    }

    #[test]
    fn test_format_hex_packet() {
        assert_eq!(format_hex_packet(&[0x00, 0x0A, 0xFF]), "00 0A FF");
        assert_eq!(format_hex_packet(&[]), "");
    }
}

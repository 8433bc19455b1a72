//! Modbus TCP message model
//!
//! Requests and responses are plain values. The exception bit on the function
//! code never appears here: a response is either [`ResponseBody::Success`] or
//! [`ResponseBody::Exception`], and the codec sets the bit when it writes bytes.

use std::fmt;

use crate::constants::{
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE, EXCEPTION_ILLEGAL_FUNCTION,
    FC_READ_HOLDING_REGISTERS, MAX_MBAP_LENGTH, MBAP_HEADER_LEN, MIN_MBAP_LENGTH,
};
use crate::error::DecodeError;
use crate::pdu::ModbusPdu;

/// Modbus unit identifier (echoed verbatim, never routed on)
pub type UnitId = u8;

/// Modbus Application Protocol header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Byte count of unit id + PDU
    pub length: u16,
    pub unit_id: UnitId,
}

impl MbapHeader {
    /// Parse the fixed 7-byte header at the start of `bytes`.
    ///
    /// Only the size is checked here; protocol id and length are validated by
    /// the caller, which knows how much of the frame it holds.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < MBAP_HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: MBAP_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        })
    }

    /// Number of PDU bytes that follow the header, as declared by `length`
    #[inline]
    pub fn pdu_len(&self) -> usize {
        (self.length as usize).saturating_sub(1)
    }

    /// Reject lengths that cannot describe a Modbus TCP frame.
    ///
    /// Used when reading from a stream, before the body is read, so a bogus
    /// header never drives a large read.
    pub fn check_length(&self) -> Result<(), DecodeError> {
        let length = self.length as usize;
        if !(MIN_MBAP_LENGTH..=MAX_MBAP_LENGTH).contains(&length) {
            return Err(DecodeError::LengthOutOfRange(self.length));
        }
        Ok(())
    }
}

/// Function-specific part of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPdu {
    /// FC03 Read Holding Registers
    ReadHoldingRegisters { start_address: u16, quantity: u16 },
    /// Any other function code; answered with Illegal Function
    Unsupported { function_code: u8 },
}

impl RequestPdu {
    /// Raw function code byte
    pub fn function_code(&self) -> u8 {
        match self {
            Self::ReadHoldingRegisters { .. } => FC_READ_HOLDING_REGISTERS,
            Self::Unsupported { function_code } => *function_code,
        }
    }
}

/// Decoded Modbus TCP request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub transaction_id: u16,
    pub unit_id: UnitId,
    pub pdu: RequestPdu,
}

impl Request {
    /// Build a Read Holding Registers request
    pub fn read_holding_registers(
        transaction_id: u16,
        unit_id: UnitId,
        start_address: u16,
        quantity: u16,
    ) -> Self {
        Self {
            transaction_id,
            unit_id,
            pdu: RequestPdu::ReadHoldingRegisters {
                start_address,
                quantity,
            },
        }
    }

    /// Raw function code byte
    #[inline]
    pub fn function_code(&self) -> u8 {
        self.pdu.function_code()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID={} UID={} ", self.transaction_id, self.unit_id)?;
        match self.pdu {
            RequestPdu::ReadHoldingRegisters {
                start_address,
                quantity,
            } => write!(
                f,
                "FC=0x{:02X} ({}) Start={} Qty={}",
                FC_READ_HOLDING_REGISTERS,
                ModbusPdu::function_code_description(FC_READ_HOLDING_REGISTERS),
                start_address,
                quantity
            ),
            RequestPdu::Unsupported { function_code } => write!(
                f,
                "FC=0x{:02X} ({}) unsupported",
                function_code,
                ModbusPdu::function_code_description(function_code)
            ),
        }
    }
}

/// Modbus exception codes produced by the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = EXCEPTION_ILLEGAL_FUNCTION,
    IllegalDataAddress = EXCEPTION_ILLEGAL_DATA_ADDRESS,
    IllegalDataValue = EXCEPTION_ILLEGAL_DATA_VALUE,
}

impl ExceptionCode {
    /// Wire value
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IllegalFunction => "Illegal Function",
            Self::IllegalDataAddress => "Illegal Data Address",
            Self::IllegalDataValue => "Illegal Data Value",
        };
        write!(f, "{} (0x{:02X})", name, self.to_u8())
    }
}

/// Outcome of handling a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Register values in ascending address order
    Success(Vec<u16>),
    Exception(ExceptionCode),
}

/// Response ready to be encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub transaction_id: u16,
    pub unit_id: UnitId,
    /// Function code of the triggering request, without the exception bit
    pub function_code: u8,
    pub body: ResponseBody,
}

impl Response {
    /// Successful reply to `request` carrying `registers`
    pub fn success(request: &Request, registers: Vec<u16>) -> Self {
        Self {
            transaction_id: request.transaction_id,
            unit_id: request.unit_id,
            function_code: request.function_code(),
            body: ResponseBody::Success(registers),
        }
    }

    /// Exception reply to `request`
    pub fn exception(request: &Request, code: ExceptionCode) -> Self {
        Self {
            transaction_id: request.transaction_id,
            unit_id: request.unit_id,
            function_code: request.function_code(),
            body: ResponseBody::Exception(code),
        }
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        matches!(self.body, ResponseBody::Exception(_))
    }

    /// Register values for a successful response
    pub fn registers(&self) -> Option<&[u16]> {
        match &self.body {
            ResponseBody::Success(registers) => Some(registers),
            ResponseBody::Exception(_) => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID={} UID={} ", self.transaction_id, self.unit_id)?;
        match &self.body {
            ResponseBody::Success(registers) => write!(
                f,
                "FC=0x{:02X} ByteCount={} Values={:?}",
                self.function_code,
                registers.len() * 2,
                registers
            ),
            ResponseBody::Exception(code) => write!(
                f,
                "FC=0x{:02X} Exception={}",
                self.function_code | crate::constants::EXCEPTION_FLAG,
                code
            ),
        }
    }
}

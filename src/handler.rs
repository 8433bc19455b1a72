//! Request dispatch for the clock register bank
//!
//! Validation order is fixed so overlapping faults always map to the same
//! exception code:
//!
//! 1. function code other than 0x03 → Illegal Function
//! 2. quantity of 0 or above 125 → Illegal Data Value
//! 3. `start + quantity` past register 5 → Illegal Data Address

use std::ops::Range;

use crate::clock::TimeSource;
use crate::constants::{CLOCK_REGISTER_COUNT, MAX_READ_REGISTERS};
use crate::protocol::{ExceptionCode, Request, RequestPdu, Response};

/// Answer one decoded request.
///
/// The time source is sampled only when the request is valid.
///
/// # Example
///
/// ```rust
/// use modbus_clock::{handle, ClockReading, FixedClock, Request};
///
/// let clock = FixedClock(ClockReading::new(15, 6, 2025, 10, 30, 45));
/// let response = handle(&Request::read_holding_registers(1, 1, 3, 3), &clock);
/// assert_eq!(response.registers(), Some(&[10, 30, 45][..]));
/// ```
pub fn handle<T: TimeSource + ?Sized>(request: &Request, clock: &T) -> Response {
    match request.pdu {
        RequestPdu::Unsupported { .. } => {
            Response::exception(request, ExceptionCode::IllegalFunction)
        }
        RequestPdu::ReadHoldingRegisters {
            start_address,
            quantity,
        } => match register_range(start_address, quantity) {
            Ok(range) => {
                let bank = clock.read().registers();
                Response::success(request, bank[range].to_vec())
            }
            Err(code) => Response::exception(request, code),
        },
    }
}

/// Check a read against the protocol ceiling and the register bank bound,
/// returning the slice of the bank to serve
pub fn register_range(start_address: u16, quantity: u16) -> Result<Range<usize>, ExceptionCode> {
    if quantity == 0 || quantity > MAX_READ_REGISTERS {
        return Err(ExceptionCode::IllegalDataValue);
    }

    let start = start_address as usize;
    let end = start + quantity as usize;
    if end > CLOCK_REGISTER_COUNT as usize {
        return Err(ExceptionCode::IllegalDataAddress);
    }

    Ok(start..end)
}

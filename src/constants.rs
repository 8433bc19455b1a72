//! Modbus protocol constants based on official specification
//!
//! These constants are derived from the official Modbus specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - Register limits are calculated to fit within the PDU size constraint
//!
//! The clock register map is fixed at six registers and lives here as well so
//! the handler and the codec agree on it.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP, including the unit identifier
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1) = 7 bytes
pub const MBAP_HEADER_LEN: usize = 7;

/// Protocol identifier carried by every Modbus TCP frame
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
/// = 1 (Unit ID) + 253 (Max PDU) = 254 bytes
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Smallest usable MBAP length field value: Unit ID + Function Code
pub const MIN_MBAP_LENGTH: usize = 2;

/// Payload length of a Read Holding Registers request after the function code:
/// Starting Address(2) + Quantity(2)
pub const READ_REQUEST_PAYLOAD_LEN: usize = 4;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03 (Read Holding Registers)
///
/// Calculation for response PDU:
/// - Function Code: 1 byte
/// - Byte Count: 1 byte
/// - Register Data: N × 2 bytes
/// - Total: 1 + 1 + (N × 2) ≤ 253
/// - Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: u16 = 125;

/// Number of holding registers exposed by the clock (addresses 0-5)
pub const CLOCK_REGISTER_COUNT: u16 = 6;

// ============================================================================
// Clock Register Map
// ============================================================================

/// Day of month (1-31)
pub const REG_DAY: u16 = 0;

/// Month (1-12)
pub const REG_MONTH: u16 = 1;

/// Calendar year, unscaled (e.g. 2025)
pub const REG_YEAR: u16 = 2;

/// Hour (0-23)
pub const REG_HOUR: u16 = 3;

/// Minute (0-59)
pub const REG_MINUTE: u16 = 4;

/// Second (0-59)
pub const REG_SECOND: u16 = 5;

/// Human-readable register map, logged at startup
pub const REGISTER_MAP_DESCRIPTION: &str = "0=Day, 1=Month, 2=Year, 3=Hour, 4=Minute, 5=Second";

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// High bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MBAP_HEADER_LEN, 7);
        assert_eq!(MAX_PDU_SIZE, 253);
        assert_eq!(MAX_MBAP_LENGTH, 254);
        assert_eq!(MIN_MBAP_LENGTH, 2);
    }

    #[test]
    fn test_register_limits() {
        // Verify read register limit calculation
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS as usize * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_READ_REGISTERS, 125);
    }

    #[test]
    fn test_register_map_is_contiguous() {
        let map = [REG_DAY, REG_MONTH, REG_YEAR, REG_HOUR, REG_MINUTE, REG_SECOND];
        for (expected, &addr) in map.iter().enumerate() {
            assert_eq!(addr as usize, expected);
        }
        assert_eq!(map.len(), CLOCK_REGISTER_COUNT as usize);
    }
}

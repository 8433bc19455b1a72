//! Error types for the clock responder
//!
//! Two layers are kept apart:
//!
//! - [`DecodeError`] covers framing failures found while parsing an ADU. Any of
//!   them ends the connection, because the next frame boundary is unknown.
//! - [`ModbusError`] is the crate-wide error returned by I/O, configuration and
//!   startup paths.
//!
//! Protocol-semantic problems (unsupported function, bad address range, bad
//! quantity) are not errors at all: they become exception responses in
//! [`crate::protocol::ResponseBody::Exception`].

use std::io;

use thiserror::Error;

/// Result type used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Framing error raised while decoding a Modbus TCP ADU
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes were available than the frame structure requires
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// MBAP protocol identifier was not 0
    #[error("Invalid protocol id: {0:#06X}")]
    BadProtocolId(u16),

    /// MBAP length field disagrees with the bytes that follow it
    #[error("Length mismatch: header declares {declared} bytes, frame carries {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    /// MBAP length field is outside the range a Modbus TCP frame can carry
    #[error("MBAP length out of range: {0}")]
    LengthOutOfRange(u16),
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum ModbusError {
    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame received from a peer
    #[error("Frame error: {0}")]
    Decode(#[from] DecodeError),

    /// Listening socket could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Protocol violation that is not a framing error
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Peer closed the stream in the middle of a frame
    #[error("Connection closed mid-frame")]
    ConnectionClosed,
}

impl ModbusError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a bind error for the given address
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Whether a bind failure was caused by missing privileges
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Bind { source, .. } | Self::Io(source) => {
                source.kind() == io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}

//! # Modbus Clock - System Time over Modbus TCP
//!
//! A small Modbus TCP responder that publishes the host's local wall-clock
//! time as six read-only holding registers. Any Modbus master (PLC, SCADA,
//! HMI, test tool) can read the time with a single Function Code 0x03 request.
//!
//! ## Features
//!
//! - **Async**: one Tokio task per client, so a stalled peer never blocks others
//! - **Strict framing**: malformed frames close the connection without a reply
//! - **Protocol exceptions**: bad function codes and ranges get standard
//!   exception responses and the connection stays open
//! - **Logging**: `tracing` events with hex dumps of every frame, to the
//!   console and a size-rotated log file
//!
//! ## Register Map
//!
//! | Address | Content | Range |
//! |---------|---------|-------|
//! | 0 | Day | 1-31 |
//! | 1 | Month | 1-12 |
//! | 2 | Year | e.g. 2025 |
//! | 3 | Hour | 0-23 |
//! | 4 | Minute | 0-59 |
//! | 5 | Second | 0-59 |
//!
//! Every read samples the clock once, so all registers in one response come
//! from the same instant.
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Server |
//! |------|----------|--------|
//! | 0x03 | Read Holding Registers | ✅ |
//!
//! Any other function code is answered with exception 0x01.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modbus_clock::{ClockServer, ModbusResult, ServerConfig, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let config = ServerConfig::new("0.0.0.0", 5020);
//!     let server = ClockServer::bind(&config, Arc::new(SystemClock)).await?;
//!     server.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus TCP constants and the clock register map
pub mod constants;

/// PDU buffer and builder
pub mod pdu;

/// Request and response types
pub mod protocol;

/// ADU decoding and encoding
pub mod codec;

// ============================================================================
// Server modules
// ============================================================================

/// Time sources
pub mod clock;

/// Request validation and register reads
pub mod handler;

/// Per-connection request loop
pub mod session;

/// TCP listener
pub mod server;

/// Server and logging configuration
pub mod config;

/// Logging system for the server
pub mod logging;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use modbus_clock::tokio) ===
pub use tokio;

// === Server API ===
pub use server::ClockServer;
pub use session::{CloseReason, Session, SessionStats, SessionSummary};

// === Error handling ===
pub use error::{DecodeError, ModbusError, ModbusResult};

// === Core types ===
pub use clock::{ClockReading, FixedClock, SystemClock, TimeSource};
pub use codec::{format_hex_packet, AduCodec};
pub use handler::handle;
pub use protocol::{
    ExceptionCode, MbapHeader, Request, RequestPdu, Response, ResponseBody, UnitId,
};

// === Configuration ===
pub use config::{LogConfig, ServerConfig, DEFAULT_HOST, DEFAULT_TCP_PORT};

// === Logging ===
pub use logging::{init_logging, RotatingFileWriter};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    CLOCK_REGISTER_COUNT, FC_READ_HOLDING_REGISTERS, MAX_PDU_SIZE, MAX_READ_REGISTERS,
};

// === PDU (advanced usage) ===
pub use pdu::{ModbusPdu, PduBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

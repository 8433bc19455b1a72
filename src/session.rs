//! Per-connection request/response loop
//!
//! A [`Session`] owns one accepted stream. It reads exactly one ADU at a time
//! (7-byte MBAP header, then `length - 1` bytes), answers it, and loops until
//! the peer hangs up or something goes wrong. Requests on one connection are
//! answered strictly in order; there is no pipelining.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::clock::TimeSource;
use crate::codec::{format_hex_packet, AduCodec};
use crate::constants::MBAP_HEADER_LEN;
use crate::error::{DecodeError, ModbusError, ModbusResult};
use crate::handler::handle;
use crate::protocol::MbapHeader;

/// Why a session ended
#[derive(Debug)]
pub enum CloseReason {
    /// Peer closed the stream at a frame boundary
    PeerClosed,
    /// Malformed frame; nothing was sent back for it
    Framing(DecodeError),
    /// Socket failure, reset, or a stream that ended mid-frame
    Transport(ModbusError),
}

impl CloseReason {
    /// Whether the session ended without any fault
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::PeerClosed)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::Framing(e) => write!(f, "framing error: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

/// Per-session traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Requests decoded and answered
    pub requests: u64,
    /// Answers that were exception responses
    pub exceptions: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

/// Final state of a finished session
#[derive(Debug)]
pub struct SessionSummary {
    pub peer: SocketAddr,
    pub reason: CloseReason,
    pub stats: SessionStats,
}

/// One client connection
pub struct Session<S, C: ?Sized> {
    stream: S,
    peer: SocketAddr,
    clock: Arc<C>,
    stats: SessionStats,
}

impl<S, C> Session<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: TimeSource + ?Sized,
{
    pub fn new(stream: S, peer: SocketAddr, clock: Arc<C>) -> Self {
        Self {
            stream,
            peer,
            clock,
            stats: SessionStats::default(),
        }
    }

    /// Serve requests until the connection closes.
    ///
    /// Never returns an error: every way out of the loop is reported as a
    /// [`CloseReason`]. The stream is shut down and dropped on all paths.
    pub async fn run(mut self) -> SessionSummary {
        info!(peer = %self.peer, "Client connected");

        let reason = loop {
            match self.serve_one().await {
                Ok(true) => continue,
                Ok(false) => break CloseReason::PeerClosed,
                Err(ModbusError::Decode(e)) => break CloseReason::Framing(e),
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "Connection error");
                    break CloseReason::Transport(e);
                }
            }
        };

        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Shutdown after close failed");
        }

        info!(
            peer = %self.peer,
            reason = %reason,
            requests = self.stats.requests,
            exceptions = self.stats.exceptions,
            bytes_in = self.stats.bytes_received,
            bytes_out = self.stats.bytes_sent,
            "Client disconnected"
        );

        SessionSummary {
            peer: self.peer,
            reason,
            stats: self.stats,
        }
    }

    /// Handle one request/response exchange.
    ///
    /// Returns `Ok(false)` when the peer closed the stream before sending any
    /// byte of a new frame.
    async fn serve_one(&mut self) -> ModbusResult<bool> {
        let frame = match self.read_frame().await? {
            Some(frame) => frame,
            None => return Ok(false),
        };
        self.stats.bytes_received += frame.len() as u64;

        let request = match AduCodec::decode(&frame) {
            Ok(request) => request,
            Err(e) => {
                error!(
                    peer = %self.peer,
                    raw = %format_hex_packet(&frame),
                    error = %e,
                    "Malformed request frame, closing connection"
                );
                return Err(e.into());
            }
        };
        info!(
            peer = %self.peer,
            raw = %format_hex_packet(&frame),
            "Request {}",
            request
        );

        let response = handle(&request, self.clock.as_ref());
        let bytes = AduCodec::encode_response(&response)?;

        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        self.stats.requests += 1;
        self.stats.bytes_sent += bytes.len() as u64;
        if response.is_exception() {
            self.stats.exceptions += 1;
        }

        info!(
            peer = %self.peer,
            raw = %format_hex_packet(&bytes),
            "Response {}",
            response
        );
        Ok(true)
    }

    /// Read one length-delimited ADU.
    async fn read_frame(&mut self) -> ModbusResult<Option<Vec<u8>>> {
        let mut header = [0u8; MBAP_HEADER_LEN];
        let mut filled = 0;
        while filled < MBAP_HEADER_LEN {
            let n = self.stream.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ModbusError::ConnectionClosed);
            }
            filled += n;
        }

        let mbap = MbapHeader::parse(&header)?;
        if let Err(e) = mbap.check_length() {
            error!(
                peer = %self.peer,
                raw = %format_hex_packet(&header),
                error = %e,
                "Malformed MBAP header, closing connection"
            );
            return Err(e.into());
        }

        let mut frame = vec![0u8; MBAP_HEADER_LEN + mbap.pdu_len()];
        frame[..MBAP_HEADER_LEN].copy_from_slice(&header);
        self.stream
            .read_exact(&mut frame[MBAP_HEADER_LEN..])
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ModbusError::ConnectionClosed,
                _ => ModbusError::Io(e),
            })?;

        Ok(Some(frame))
    }
}

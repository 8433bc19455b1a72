//! TCP listener for the clock responder
//!
//! [`ClockServer`] binds once, then accepts forever, starting one tokio task
//! per connection. Sessions share nothing but an `Arc` of the time source, so
//! a slow or broken client never holds up another.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modbus_clock::{ClockServer, ModbusResult, ServerConfig, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let config = ServerConfig::new("127.0.0.1", 5020);
//!     let server = ClockServer::bind(&config, Arc::new(SystemClock)).await?;
//!     server.run().await
//! }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

use crate::clock::{SystemClock, TimeSource};
use crate::config::ServerConfig;
use crate::constants::REGISTER_MAP_DESCRIPTION;
use crate::error::{ModbusError, ModbusResult};
use crate::session::Session;

/// Pending-connection queue length for the listening socket
const LISTEN_BACKLOG: u32 = 1024;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Modbus TCP listener serving clock registers
pub struct ClockServer<C: ?Sized = SystemClock> {
    listener: TcpListener,
    local_addr: SocketAddr,
    clock: Arc<C>,
}

impl<C> ClockServer<C>
where
    C: TimeSource + ?Sized + 'static,
{
    /// Bind the listening socket.
    ///
    /// Failure here is fatal for the process; nothing has been accepted yet.
    pub async fn bind(config: &ServerConfig, clock: Arc<C>) -> ModbusResult<Self> {
        config.validate()?;

        let address = config.socket_addr();
        let listener = bind_listener(&address).await?;
        let local_addr = listener.local_addr()?;

        info!(address = %local_addr, "Modbus TCP clock server listening");
        info!("Registers exposed (0-based): {}", REGISTER_MAP_DESCRIPTION);

        Ok(Self {
            listener,
            local_addr,
            clock,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the process exits
    pub async fn run(self) -> ModbusResult<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> ModbusResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_session(stream, peer),
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            if backoff_or_shutdown(shutdown.as_mut()).await {
                                info!("Shutting down");
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let clock = Arc::clone(&self.clock);
        tokio::spawn(async move {
            Session::new(stream, peer, clock).run().await;
        });
    }
}

/// Wait out the accept backoff. Returns `true` if `shutdown` completed first.
async fn backoff_or_shutdown<F>(shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown => true,
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
    }
}

/// Resolve `address` and bind the first candidate that works
async fn bind_listener(address: &str) -> ModbusResult<TcpListener> {
    let candidates = lookup_host(address)
        .await
        .map_err(|e| ModbusError::bind(address, e))?;

    let mut last_error = None;
    for addr in candidates {
        match bind_reuse(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!(address = %addr, error = %e, "Bind attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ModbusError::bind(
        address,
        last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
        }),
    ))
}

fn bind_reuse(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    // On Windows SO_REUSEADDR lets another process steal the port
    #[cfg(not(windows))]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ClockReading, FixedClock};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(ClockReading::new(15, 6, 2025, 10, 30, 45)))
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = ClockServer::bind(&ServerConfig::new("127.0.0.1", 0), clock())
            .await
            .unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.local_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_port_in_use_fails() {
        let first = ClockServer::bind(&ServerConfig::new("127.0.0.1", 0), clock())
            .await
            .unwrap();
        let port = first.local_addr().port();

        let err = ClockServer::bind(&ServerConfig::new("127.0.0.1", port), clock())
            .await
            .err()
            .expect("second bind on a listening port must fail");
        assert!(matches!(err, ModbusError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let result = ClockServer::bind(&ServerConfig::new("", 0), clock()).await;
        assert!(matches!(result, Err(ModbusError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_backoff_ends_early_on_shutdown() {
        let started = std::time::Instant::now();
        let shutdown = std::future::ready(());
        tokio::pin!(shutdown);
        assert!(backoff_or_shutdown(shutdown.as_mut()).await);
        assert!(started.elapsed() < ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_backoff_sleeps_without_shutdown() {
        let started = std::time::Instant::now();
        let shutdown = std::future::pending::<()>();
        tokio::pin!(shutdown);
        assert!(!backoff_or_shutdown(shutdown.as_mut()).await);
        assert!(started.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_serves_then_shuts_down() {
        let server = ClockServer::bind(&ServerConfig::new("127.0.0.1", 0), clock())
            .await
            .unwrap();
        let addr = server.local_addr();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&[0x00, 0x09, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x02, 0x00, 0x01])
            .await
            .unwrap();
        let mut response = [0u8; 11];
        stream.read_exact(&mut response).await.unwrap();
        assert_eq!(
            response,
            [0x00, 0x09, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x07, 0xE9]
        );

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}

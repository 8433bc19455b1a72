//! Server and logging configuration
//!
//! Values come from the command line (see the `modbus-clock-server` binary) but
//! the types here carry no CLI dependency, so tests and embedders can build
//! them directly.

use std::path::PathBuf;

use crate::error::{ModbusError, ModbusResult};

/// Default bind host: all interfaces
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Default log file path
pub const DEFAULT_LOG_FILE: &str = "modbus_server.log";

/// Default size at which the log file is rotated (5 MiB)
pub const DEFAULT_MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of rotated log files kept next to the active one
pub const DEFAULT_MAX_LOG_BACKUPS: usize = 5;

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address to bind
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_TCP_PORT,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Check the configuration before binding
    pub fn validate(&self) -> ModbusResult<()> {
        if self.host.trim().is_empty() {
            return Err(ModbusError::configuration("Bind host must not be empty"));
        }
        Ok(())
    }

    /// `host:port` string suitable for address resolution.
    ///
    /// Bare IPv6 literals are wrapped in brackets.
    pub fn socket_addr(&self) -> String {
        let host = self.host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log file path; `None` disables file logging
    pub file: Option<PathBuf>,
    /// Also log to the console
    pub console: bool,
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Rotate the file once it would grow past this many bytes
    pub max_file_size: u64,
    /// Rotated files kept as `<file>.1` .. `<file>.N`
    pub max_backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            console: true,
            level: "info".to_string(),
            max_file_size: DEFAULT_MAX_LOG_FILE_SIZE,
            max_backups: DEFAULT_MAX_LOG_BACKUPS,
        }
    }
}

impl LogConfig {
    /// Check the configuration before installing the subscriber
    pub fn validate(&self) -> ModbusResult<()> {
        if self.max_file_size == 0 {
            return Err(ModbusError::configuration(
                "Log file size limit must be greater than zero",
            ));
        }
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                return Err(ModbusError::configuration("Log file path must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 502);
        assert_eq!(config.socket_addr(), "0.0.0.0:502");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_addr_ipv6() {
        assert_eq!(ServerConfig::new("::1", 5020).socket_addr(), "[::1]:5020");
        assert_eq!(ServerConfig::new("[::]", 502).socket_addr(), "[::]:502");
        assert_eq!(
            ServerConfig::new("localhost", 5020).socket_addr(),
            "localhost:5020"
        );
    }

    #[test]
    fn test_empty_host_rejected() {
        let err = ServerConfig::new("  ", 502).validate().unwrap_err();
        assert!(matches!(err, ModbusError::Configuration { .. }));
    }

    #[test]
    fn test_log_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.file, Some(PathBuf::from("modbus_server.log")));
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.max_backups, 5);
        assert!(config.console);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_validation() {
        let config = LogConfig {
            max_file_size: 0,
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LogConfig {
            file: Some(PathBuf::new()),
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());

        let config = LogConfig {
            file: None,
            ..LogConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}

//! Modbus TCP Clock Server
//!
//! Serves the local system time as holding registers 0-5
//! (Day, Month, Year, Hour, Minute, Second).
//!
//! Usage: modbus-clock-server [--host HOST] [--port PORT] [--log-file PATH] [--quiet]
//! Example: modbus-clock-server --port 5020

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use modbus_clock::{init_logging, ClockServer, LogConfig, ModbusResult, ServerConfig, SystemClock};

const PERMISSION_HINT: &str = "[ERROR] Permission denied binding to port. \
On Unix-like systems, ports <1024 require admin/root.
       Try a higher port (e.g., --port 5020) or run with elevated privileges.";

/// Modbus TCP server exposing the system clock via holding registers
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Host/IP to bind (all interfaces by default)
    #[clap(long, default_value = modbus_clock::DEFAULT_HOST, env = "MODBUS_CLOCK_HOST")]
    host: String,

    /// TCP port to listen on
    #[clap(
        short = 'p',
        long,
        default_value_t = modbus_clock::DEFAULT_TCP_PORT,
        env = "MODBUS_CLOCK_PORT"
    )]
    port: u16,

    /// Path to log file
    #[clap(long, default_value = modbus_clock::config::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Disable console log output (file logging continues)
    #[clap(short = 'q', long)]
    quiet: bool,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.host.clone(), self.port)
    }

    fn log_config(&self) -> LogConfig {
        LogConfig {
            file: Some(self.log_file.clone()),
            console: !self.quiet,
            level: self.log_level.clone(),
            ..LogConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(&cli.log_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("[ERROR] Failed to initialise logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serve(&cli).await {
        Ok(()) => {
            println!("\nShutting down...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server failed");
            if e.is_permission_denied() {
                eprintln!("\n{}\n", PERMISSION_HINT);
            } else {
                eprintln!("[ERROR] {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn serve(cli: &Cli) -> ModbusResult<()> {
    let server = ClockServer::bind(&cli.server_config(), Arc::new(SystemClock)).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}

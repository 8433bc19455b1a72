//! Logging setup for the clock server
//!
//! Everything in the crate logs through `tracing`. This module installs the
//! subscriber: an optional console layer plus an optional file layer that
//! writes through a non-blocking worker into a size-rotating file.
//!
//! Line format: `2025-06-15 10:30:45 [INFO] message key=value ...`

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogConfig;
use crate::error::{ModbusError, ModbusResult};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Event formatter that outputs: `local-timestamp [LEVEL] message`
struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(writer, "{} ", now.format("%Y-%m-%d %H:%M:%S"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Size-based rotating log file
///
/// When a write would push the active file past `max_size`, the file is
/// renamed to `<path>.1`, existing backups shift up by one, and anything past
/// `<path>.<max_backups>` is deleted. With `max_backups == 0` the active file
/// is truncated instead.
pub struct RotatingFileWriter {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    file: File,
    size: u64,
}

impl RotatingFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_size: u64, max_backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = open_append(&path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            path,
            max_size,
            max_backups,
            file,
            size,
        })
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of backup number `index` (1 = most recent)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_backups == 0 {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
            self.size = 0;
            return Ok(());
        }

        remove_if_exists(&self.backup_path(self.max_backups))?;
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = open_append(&self.path)?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level` when set. The returned guard flushes
/// the file writer on drop and must be held for the life of the process.
pub fn init_logging(config: &LogConfig) -> ModbusResult<Option<WorkerGuard>> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ModbusError::configuration(format!("Invalid log level: {}", e)))?;

    let console_layer = config
        .console
        .then(|| fmt::layer().with_ansi(true).event_format(LogLineFormat));

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let writer =
                RotatingFileWriter::new(path, config.max_file_size, config.max_backups)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .event_format(LogLineFormat);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ModbusError::configuration(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }

    #[test]
    fn test_backup_path_naming() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotatingFileWriter::new(dir.path().join("server.log"), 1024, 3).unwrap();
        assert_eq!(writer.backup_path(2), dir.path().join("server.log.2"));
        assert_eq!(writer.path(), dir.path().join("server.log"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("server.log");
        let mut writer = RotatingFileWriter::new(&path, 1024, 1).unwrap();
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_rotation_keeps_bounded_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let mut writer = RotatingFileWriter::new(&path, 10, 2).unwrap();

        // Each 8-byte line forces a rotation after the first
        for line in ["line-01\n", "line-02\n", "line-03\n", "line-04\n"] {
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line-04\n");
        assert_eq!(
            fs::read_to_string(writer.backup_path(1)).unwrap(),
            "line-03\n"
        );
        assert_eq!(
            fs::read_to_string(writer.backup_path(2)).unwrap(),
            "line-02\n"
        );
        assert!(!writer.backup_path(3).exists());
    }

    #[test]
    fn test_rotation_without_backups_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let mut writer = RotatingFileWriter::new(&path, 10, 0).unwrap();

        writer.write_all(b"first---\n").unwrap();
        writer.write_all(b"second--\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second--\n");
        assert!(!writer.backup_path(1).exists());
    }

    #[test]
    fn test_existing_file_size_counts_toward_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        fs::write(&path, b"0123456789").unwrap();

        let mut writer = RotatingFileWriter::new(&path, 12, 1).unwrap();
        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abc");
        assert_eq!(
            fs::read_to_string(writer.backup_path(1)).unwrap(),
            "0123456789"
        );
    }

    #[test]
    fn test_init_logging_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let config = LogConfig {
            file: Some(path.clone()),
            console: false,
            level: "info".to_string(),
            ..LogConfig::default()
        };

        let guard = init_logging(&config).unwrap();
        tracing::info!(peer = "127.0.0.1:1", "Client connected");
        drop(guard);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[INFO] Client connected peer=\"127.0.0.1:1\""));
    }
}

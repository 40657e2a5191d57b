#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use time::{macros::format_description, OffsetDateTime};

use crate::error::ContextError;

/// Sends every log line both to the standard error and to the log file of the run.
struct TeeWriter {
    log_file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buffer)?;
        self.log_file.write_all(buffer)?;
        Ok(buffer.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.log_file.flush()
    }
}

/// Installs the global logger with the given level, writing lines formatted as
/// `<timestamp> - <LEVEL> - [<file>:<line>] - <message>` to the standard error and to `log_path`.
/// The directory of the log file is created if needed.
pub fn initialize_logger(log_path: &Path, level_filter: log::LevelFilter) -> Result<(), ContextError> {
    if let Some(log_directory) = log_path.parent() {
        std::fs::create_dir_all(log_directory).map_err(|error| {
            ContextError::with_error(
                format!("Unable to create the log directory {:?}", log_directory),
                &error,
            )
        })?;
    }
    let log_file = File::create(log_path).map_err(|error| {
        ContextError::with_error(format!("Unable to create the log file {:?}", log_path), &error)
    })?;

    env_logger::builder()
        .filter_level(level_filter)
        .format(|buffer, record| {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let timestamp = now
                .format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]"
                ))
                .unwrap_or_default();
            writeln!(
                buffer,
                "{} - {} - [{}:{}] - {}",
                timestamp,
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { log_file })))
        .try_init()
        .map_err(|error| ContextError::with_error("Unable to install the logger", &error))
}

/// Logs the version of the program and a description of the system it runs on.
pub fn log_system_info() {
    log::info!("=== Application Started ===");
    log::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    log::info!("Operating system: {}", std::env::consts::OS);
    log::info!("Architecture: {}", std::env::consts::ARCH);
    log::info!("Family: {}", std::env::consts::FAMILY);
    match std::env::current_dir() {
        Ok(current_directory) => log::info!("Working directory: {:?}", current_directory),
        Err(error) => log::warn!("Unable to determine the working directory: {}", error),
    }
}

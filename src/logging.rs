use crate::config::LoggingSettings;
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use std::path::{Path, PathBuf};
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

pub const LOG_FILE_NAME: &str = "downloader.log";

/// Keeps the session logger installed. Dropping it uninstalls the logger and
/// flushes the file writer.
pub struct LogGuard {
    _default: DefaultGuard,
    _file: WorkerGuard,
    log_file: PathBuf,
}

impl LogGuard {
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

/// Maps the level names used in the settings file. Unknown names mean INFO.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Builds the diagnostic logger from settings and installs it as the default
/// for the current thread until the returned guard is dropped.
///
/// Events always go to a rotating file under `log_directory` (rotated daily or
/// when it outgrows `max_log_file_size` MB, keeping `backup_count` old files)
/// and to stderr when `console_output` is set.
pub fn init(settings: &LoggingSettings, verbose: bool) -> std::io::Result<LogGuard> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        parse_level(&settings.level)
    };

    std::fs::create_dir_all(&settings.log_directory)?;
    let log_file = settings.log_directory.join(LOG_FILE_NAME);

    let mut condition = RollingConditionBasic::new().daily();
    if settings.max_log_file_size > 0 {
        condition = condition.max_size(settings.max_log_file_size.saturating_mul(1024 * 1024));
    }
    let appender = BasicRollingFileAppender::new(&log_file, condition, settings.backup_count)?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);
    let console_layer = settings
        .console_output
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let subscriber = tracing_subscriber::registry()
        .with(level)
        .with(file_layer)
        .with(console_layer);

    Ok(LogGuard {
        _default: tracing::subscriber::set_default(subscriber),
        _file: file_guard,
        log_file,
    })
}

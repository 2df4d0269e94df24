pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod utils;

pub use config::AppConfig;
pub use core::{
    DownloadReport, DownloadRequest, Downloader, MediaBackend, MediaInfo, OutputFormat,
    VideoSource, YdlOptions, YtDlpBackend,
};
pub use error::{BackendError, ConfigError, JournalError};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Application settings. Loaded once at startup and never mutated afterwards.
///
/// Every key falls back to its default when absent, so a settings file only
/// needs to mention the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(rename = "download_settings")]
    pub download: DownloadSettings,
    #[serde(rename = "quality_settings")]
    pub quality: QualitySettings,
    #[serde(rename = "playlist_settings")]
    pub playlist: PlaylistSettings,
    #[serde(rename = "network_settings")]
    pub network: NetworkSettings,
    #[serde(rename = "logging_settings")]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub download_directory: PathBuf,
    pub max_concurrent_downloads: u32,
    pub max_file_size_mb: u64,
    pub write_subtitles: bool,
    pub write_auto_subtitles: bool,
    pub max_filename_length: usize,
    pub ytdlp_path: String,
    pub journal_file: PathBuf,
    pub downloaded_by: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            download_directory: PathBuf::from("Downloads"),
            max_concurrent_downloads: 3,
            max_file_size_mb: 500,
            write_subtitles: true,
            write_auto_subtitles: false,
            max_filename_length: 180,
            ytdlp_path: "yt-dlp".to_string(),
            journal_file: PathBuf::from("downloads_log.csv"),
            downloaded_by: "User".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub max_video_height: u32,
    pub audio_quality: String,
    pub preferred_video_codec: String,
    pub preferred_audio_codec: String,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            max_video_height: 1080,
            audio_quality: "192".to_string(),
            preferred_video_codec: "h264".to_string(),
            preferred_audio_codec: "aac".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    pub max_playlist_items: usize,
    pub create_playlist_folders: bool,
    pub download_playlists_by_default: bool,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            max_playlist_items: 100,
            create_playlist_folders: true,
            download_playlists_by_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub socket_timeout: u64,
    pub http_chunk_size: u64,
    pub retries: u32,
    pub prefer_ipv6: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            socket_timeout: 30,
            http_chunk_size: 10_485_760,
            retries: 5,
            prefer_ipv6: false,
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Size of one diagnostic log file in megabytes before it is rotated.
    pub max_log_file_size: u64,
    pub backup_count: usize,
    pub console_output: bool,
    pub log_directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            max_log_file_size: 10,
            backup_count: 5,
            console_output: true,
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Reads the settings file at `path`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is an
    /// error so the caller can tell the user before falling back.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Writes the default settings to `path`, leaving an existing file alone.
    /// Returns whether a file was written.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

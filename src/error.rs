use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures reported by the wrapped extraction tool.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("yt-dlp not found at `{0}`")]
    NotInstalled(String),

    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("yt-dlp failed{}: {stderr}", status_suffix(.status))]
    Failed { status: Option<i32>, stderr: String },

    #[error("invalid metadata from yt-dlp: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

impl BackendError {
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self::Failed {
            status: None,
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_message_includes_stderr() {
        let err = BackendError::Failed {
            status: Some(1),
            stderr: "ERROR: Cannot parse data".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "yt-dlp failed (exit code 1): ERROR: Cannot parse data"
        );
        assert_eq!(
            BackendError::failed("boom").to_string(),
            "yt-dlp failed: boom"
        );
    }
}

use crate::core::{MediaInfo, YdlOptions};
use crate::error::BackendError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// The wrapped extraction tool.
///
/// `probe` only resolves metadata; `download` fetches and post-processes the
/// media according to `opts`. Both block until the tool finishes.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `Ok(None)` when the tool ran but produced no metadata.
    async fn probe(&self, url: &str, opts: &YdlOptions) -> Result<Option<MediaInfo>, BackendError>;

    async fn download(&self, url: &str, opts: &YdlOptions) -> Result<(), BackendError>;
}

/// Runs the `yt-dlp` binary as a child process.
pub struct YtDlpBackend {
    binary: String,
}

impl YtDlpBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true).stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> BackendError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BackendError::NotInstalled(self.binary.clone())
        } else {
            BackendError::Spawn(e)
        }
    }

    /// Installed yt-dlp version, or `NotInstalled` when the binary is missing.
    pub async fn version(&self) -> Result<String, BackendError> {
        let output = self
            .command()
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(BackendError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Asks yt-dlp to update itself. Progress goes straight to the terminal.
    pub async fn self_update(&self) -> Result<(), BackendError> {
        let status = self
            .command()
            .arg("-U")
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(BackendError::Failed {
                status: status.code(),
                stderr: "self-update failed".to_string(),
            })
        }
    }
}

/// Parses `--dump-single-json` output. yt-dlp prints `null` when every
/// extractor failed under `--ignore-errors`.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Option<MediaInfo>, BackendError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(None);
    }
    let info: MediaInfo = serde_json::from_str(text)?;
    Ok(Some(info))
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str, opts: &YdlOptions) -> Result<Option<MediaInfo>, BackendError> {
        let args = opts.to_args();
        debug!("Probing {} with: {} {}", url, self.binary, args.join(" "));

        let output = self
            .command()
            .args(&args)
            .arg("--dump-single-json")
            .arg(url)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            return parse_probe_output(&output.stdout);
        }

        // A playlist with some broken entries exits non-zero but still prints
        // the document; anything short of that is a failed probe.
        match parse_probe_output(&output.stdout) {
            Ok(Some(info)) => Ok(Some(info)),
            _ => Err(BackendError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn download(&self, url: &str, opts: &YdlOptions) -> Result<(), BackendError> {
        let args = opts.to_args();
        debug!("Downloading {} with: {} {}", url, self.binary, args.join(" "));

        // `output()` would pipe stdout too and hide the progress display.
        let child = self
            .command()
            .args(&args)
            .arg(url)
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let output = child.wait_with_output().await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BackendError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

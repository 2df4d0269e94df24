use crate::config::AppConfig;
use crate::core::options::is_fallback_signature;
use crate::core::{
    DownloadRequest, Journal, JournalRecord, MediaBackend, MediaInfo, OutputFormat, Status,
    VideoSource, YdlOptions,
};
use crate::error::BackendError;
use crate::utils::{
    find_downloaded_file, fix_facebook_url, format_duration, is_facebook_url, sanitize_filename,
    PLACEHOLDER_NAME,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Counts of terminal outcomes for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl DownloadReport {
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }

    fn record(&mut self, status: &Status) {
        if status.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Drives the wrapped tool for one request at a time and journals every
/// terminal outcome.
pub struct Downloader {
    backend: Box<dyn MediaBackend>,
    config: AppConfig,
    download_dir: PathBuf,
    journal: Journal,
}

impl Downloader {
    /// Creates the download directory and opens (or creates) the journal.
    pub fn new(
        backend: Box<dyn MediaBackend>,
        config: AppConfig,
        download_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let download_dir =
            download_dir.unwrap_or_else(|| config.download.download_directory.clone());
        std::fs::create_dir_all(&download_dir)?;
        info!("Download directory: {}", download_dir.display());

        let (journal, created) = Journal::open(&config.download.journal_file)?;
        if created {
            info!("Created journal: {}", journal.path().display());
        } else {
            info!("Using existing journal: {}", journal.path().display());
        }

        Ok(Self {
            backend,
            config,
            download_dir,
            journal,
        })
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    fn sanitize(&self, name: &str) -> String {
        sanitize_filename(name, self.config.download.max_filename_length)
    }

    fn build_options(&self, request: &DownloadRequest) -> YdlOptions {
        let playlist = request.download_playlist.then_some(request.max_downloads);
        YdlOptions::build(&self.config, &self.download_dir, request.output_format, playlist)
    }

    fn journal_outcome(
        &self,
        info: &MediaInfo,
        request: &DownloadRequest,
        url: &str,
        file_path: Option<&Path>,
        status: Status,
    ) -> Status {
        let record = JournalRecord::new(info, request, url, file_path, status.clone());
        match self.journal.append(&record) {
            Ok(()) => info!("Journal entry added: {}", record.title),
            // The download outcome stands even if it cannot be recorded.
            Err(e) => error!("Failed to write journal entry: {}", e),
        }
        status
    }

    /// Downloads a single video or a whole playlist.
    ///
    /// The request URL may be rewritten (Facebook links) and, for playlists,
    /// the playlist name is filled in from the probed title.
    pub async fn download(&self, request: &mut DownloadRequest) -> DownloadReport {
        if is_facebook_url(&request.url) {
            request.url = fix_facebook_url(&request.url);
        }

        info!(
            "Starting download from {}",
            VideoSource::classify(&request.url)
        );
        info!("URL: {}", request.url);
        info!("Format: {}", request.output_format);
        if request.download_playlist {
            info!("Playlist mode (up to {} items)", request.max_downloads);
        }

        let opts = self.build_options(request);
        info!("Fetching media information...");

        let (info, opts) = match self.probe_with_fallback(&request.url, opts).await {
            Ok((Some(info), opts)) => (info, opts),
            Ok((None, _)) => {
                error!("No media information returned for {}", request.url);
                let status = self.journal_outcome(
                    &MediaInfo::default(),
                    request,
                    &request.url,
                    None,
                    Status::failed("no metadata returned"),
                );
                return single_report(&status);
            }
            Err(e) => {
                error!("Failed to fetch media information: {}", e);
                let status = self.journal_outcome(
                    &MediaInfo::default(),
                    request,
                    &request.url,
                    None,
                    Status::failed(e.to_string()),
                );
                return single_report(&status);
            }
        };

        if info.is_playlist() {
            self.download_playlist(info, request, &opts).await
        } else {
            let status = self.download_single(&info, request, &opts).await;
            single_report(&status)
        }
    }

    /// Probes once, and once more with the platform fallback when the error
    /// carries a known breakage signature. Returns the options that worked so
    /// the download uses the same configuration.
    async fn probe_with_fallback(
        &self,
        url: &str,
        opts: YdlOptions,
    ) -> Result<(Option<MediaInfo>, YdlOptions), BackendError> {
        match self.backend.probe(url, &opts).await {
            Ok(info) => Ok((info, opts)),
            Err(e) if is_fallback_signature(&e.to_string()) => {
                warn!("Platform problem detected ({}), retrying with fallback settings", e);
                let fallback = opts.fallback_for(url);
                let info = self.backend.probe(url, &fallback).await?;
                Ok((info, fallback))
            }
            Err(e) => Err(e),
        }
    }

    /// Platform policy checks on the probed metadata. `Some` is a terminal
    /// rejection reason.
    fn reject_reason(&self, source: VideoSource, info: &MediaInfo) -> Option<&'static str> {
        match source {
            VideoSource::Instagram => {
                let flagged = ["login_required", "private_account", "user_not_found"]
                    .iter()
                    .any(|marker| info.text_contains(marker));
                (flagged || !info.has_formats()).then(|| {
                    error!("Instagram requires authentication or the video is unavailable");
                    "Instagram authentication required"
                })
            }
            VideoSource::Facebook => {
                if !info.has_formats() || !info.has_title() {
                    warn!("Facebook video may require authentication");
                    info!("Logging in to Facebook in your browser before downloading may help");
                }
                None
            }
            VideoSource::TikTok => {
                (info.text_contains("private") || !info.has_formats()).then(|| {
                    error!("TikTok video is private or unavailable");
                    "TikTok video unavailable"
                })
            }
            VideoSource::SoundCloud => {
                (info.text_contains("private") && !info.has_formats()).then(|| {
                    error!("SoundCloud track is private");
                    "SoundCloud track is private"
                })
            }
            _ => None,
        }
    }

    fn expected_extension(&self, format: OutputFormat, info: &MediaInfo) -> String {
        match format {
            OutputFormat::Mp3 => "mp3".to_string(),
            _ => info.ext.clone().unwrap_or_else(|| "mp4".to_string()),
        }
    }

    async fn download_single(
        &self,
        info: &MediaInfo,
        request: &DownloadRequest,
        opts: &YdlOptions,
    ) -> Status {
        let title = info.title.as_deref().unwrap_or(PLACEHOLDER_NAME);
        let uploader = info.naming_uploader().unwrap_or_default();
        let video_id = info.id.as_deref().unwrap_or("unknown_id");

        let clean_title = self.sanitize(&enhanced_title(info));
        let ext = self.expected_extension(request.output_format, info);

        info!("Title: {}", title);
        info!("Uploader: {}", info.uploader_or_channel().unwrap_or("unknown"));
        info!("ID: {}", video_id);
        info!("Duration: {}", format_duration(info.duration));

        let source = VideoSource::classify(&request.url);
        if let Some(reason) = self.reject_reason(source, info) {
            return self.journal_outcome(info, request, &request.url, None, Status::failed(reason));
        }

        info!("Downloading...");
        if let Err(e) = self.backend.download(&request.url, opts).await {
            error!("Download failed: {}", e);
            return self.journal_outcome(
                info,
                request,
                &request.url,
                None,
                Status::failed(e.to_string()),
            );
        }

        let found = find_downloaded_file(
            &self.download_dir,
            &ext,
            &[clean_title.as_str(), video_id, uploader],
            None,
        );
        match found {
            Some(path) => {
                info!(
                    "Downloaded: {}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                self.journal_outcome(info, request, &request.url, Some(&path), Status::Success)
            }
            None => {
                error!("Could not find the downloaded file");
                self.journal_outcome(
                    info,
                    request,
                    &request.url,
                    None,
                    Status::failed("file not found"),
                )
            }
        }
    }

    async fn download_playlist(
        &self,
        playlist: MediaInfo,
        request: &mut DownloadRequest,
        opts: &YdlOptions,
    ) -> DownloadReport {
        let playlist_title = playlist
            .title
            .clone()
            .unwrap_or_else(|| "Unknown_Playlist".to_string());
        let entries = playlist.entries.unwrap_or_default();
        let mut report = DownloadReport::default();

        if entries.is_empty() {
            warn!("Playlist is empty or unavailable");
            return report;
        }

        info!("Playlist: {}", playlist_title);
        info!("Entries found: {}", entries.len());
        request.playlist_name = playlist_title.clone();

        let playlist_dir = self.download_dir.join(self.sanitize(&playlist_title));
        let total = entries.len().min(request.max_downloads);

        for (position, entry) in entries.into_iter().take(request.max_downloads).enumerate() {
            let position = position + 1;
            let mut entry = entry.unwrap_or_default();
            entry.playlist_index = Some(position as u64);
            entry.playlist_title = Some(playlist_title.clone());

            let status = self
                .download_entry(&entry, request, opts, &playlist_dir, position, total)
                .await;
            report.record(&status);
        }

        info!(
            "Playlist finished: {}/{} downloaded",
            report.succeeded, total
        );
        report
    }

    async fn download_entry(
        &self,
        entry: &MediaInfo,
        request: &DownloadRequest,
        opts: &YdlOptions,
        playlist_dir: &Path,
        position: usize,
        total: usize,
    ) -> Status {
        let Some(url) = entry.download_url().map(str::to_string) else {
            warn!("[{}/{}] Entry unavailable, skipping", position, total);
            return self.journal_outcome(
                entry,
                request,
                &request.url,
                None,
                Status::failed("playlist entry unavailable"),
            );
        };

        let title = entry.title.as_deref().unwrap_or("Unknown");
        info!("[{}/{}] Downloading: {}", position, total, title);

        if let Err(e) = self.backend.download(&url, opts).await {
            error!("[{}/{}] Failed: {}", position, total, e);
            return self.journal_outcome(entry, request, &url, None, Status::failed(e.to_string()));
        }

        let clean_title = self.sanitize(title);
        let ext = self.expected_extension(request.output_format, entry);
        match find_downloaded_file(&self.download_dir, &ext, &[clean_title.as_str()], Some(playlist_dir)) {
            Some(path) => {
                info!("[{}/{}] Downloaded", position, total);
                self.journal_outcome(entry, request, &url, Some(&path), Status::Success)
            }
            None => {
                warn!("[{}/{}] File not found after download", position, total);
                self.journal_outcome(entry, request, &url, None, Status::failed("file not found"))
            }
        }
    }
}

/// `<uploader> - <title> - <id>`, dropping the uploader when it is unknown or
/// already part of the title.
fn enhanced_title(info: &MediaInfo) -> String {
    let title = info.title.as_deref().unwrap_or(PLACEHOLDER_NAME);
    let video_id = info.id.as_deref().unwrap_or("unknown_id");
    match info.naming_uploader() {
        Some(uploader) if !title.to_lowercase().contains(&uploader.to_lowercase()) => {
            format!("{} - {} - {}", uploader, title, video_id)
        }
        _ => format!("{} - {}", title, video_id),
    }
}

fn single_report(status: &Status) -> DownloadReport {
    let mut report = DownloadReport::default();
    report.record(status);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn title_for(value: serde_json::Value) -> String {
        enhanced_title(&MediaInfo::from_value(value).unwrap())
    }

    #[test]
    fn test_enhanced_title() {
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Clip", "uploader": "Chan"})),
            "Chan - Clip - a1"
        );
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Chan live", "uploader": "chan"})),
            "Chan live - a1"
        );
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Clip", "channel": "Chan"})),
            "Chan - Clip - a1"
        );
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Clip"})),
            "Unknown_Channel - Clip - a1"
        );
        assert_eq!(title_for(json!({})), "Unknown_Channel - Unknown_Video - unknown_id");
    }

    #[test]
    fn test_enhanced_title_without_uploader_name() {
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Clip", "uploader": null, "channel": "Chan"})),
            "Clip - a1"
        );
        assert_eq!(
            title_for(json!({"id": "a1", "title": "Clip", "uploader": ""})),
            "Clip - a1"
        );
    }
}

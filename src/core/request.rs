use crate::core::OutputFormat;

/// One user submission. Built by the CLI, rewritten in place by the
/// downloader (Facebook URL fixup, playlist name).
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_format: OutputFormat,
    pub downloaded_by: String,
    pub playlist_name: String,
    pub proxy_used: bool,
    pub notes: String,
    pub quality: String,
    pub download_playlist: bool,
    pub max_downloads: usize,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_format: OutputFormat::Mp4,
            downloaded_by: "User".to_string(),
            playlist_name: String::new(),
            proxy_used: false,
            notes: String::new(),
            quality: "best".to_string(),
            download_playlist: false,
            max_downloads: 1,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_playlist(mut self, max_downloads: usize) -> Self {
        self.download_playlist = true;
        self.max_downloads = max_downloads;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_downloaded_by(mut self, who: impl Into<String>) -> Self {
        self.downloaded_by = who.into();
        self
    }

    pub fn with_proxy(mut self, proxy_used: bool) -> Self {
        self.proxy_used = proxy_used;
        self
    }
}

/// Heuristic the prompt uses to decide whether to offer playlist mode.
pub fn looks_like_playlist(url: &str) -> bool {
    url.to_lowercase().contains("playlist") || url.contains("list=")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = DownloadRequest::new("https://vimeo.com/1");
        assert_eq!(req.output_format, OutputFormat::Mp4);
        assert_eq!(req.max_downloads, 1);
        assert!(!req.download_playlist);
        assert_eq!(req.quality, "best");
    }

    #[test]
    fn test_playlist_detection() {
        assert!(looks_like_playlist("https://www.youtube.com/playlist?list=PL1"));
        assert!(looks_like_playlist("https://www.youtube.com/watch?v=a&list=PL1"));
        assert!(looks_like_playlist("https://soundcloud.com/u/sets/PLAYLIST-x"));
        assert!(!looks_like_playlist("https://youtu.be/abc"));
    }
}

use crate::core::{DownloadRequest, MediaInfo, VideoSource};
use crate::error::JournalError;
use crate::utils::{file_size_mb, format_duration};
use chrono::Local;
use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 18] = [
    "ID",
    "Format",
    "Downloaded At",
    "Source",
    "URL",
    "Title",
    "Tags",
    "File Path",
    "File Size (MB)",
    "Duration",
    "Playlist",
    "Playlist Position",
    "Downloaded By",
    "Auto Delete",
    "Proxy",
    "Quality",
    "Notes",
    "Status",
];

pub const STATUS_SUCCESS: &str = "Success";
const MAX_TAGS: usize = 10;

/// Terminal outcome of one attempt, as written to the status column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed(String),
}

impl Status {
    pub fn failed(reason: impl Into<String>) -> Self {
        Status::Failed(reason.into())
    }

    pub fn as_cell(&self) -> String {
        match self {
            Status::Success => STATUS_SUCCESS.to_string(),
            Status::Failed(reason) => format!("Error: {}", reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// One journal row.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalRecord {
    pub id: String,
    pub format: String,
    pub timestamp: String,
    pub source: VideoSource,
    pub url: String,
    pub title: String,
    pub tags: String,
    pub file_path: String,
    pub file_size_mb: f64,
    pub duration: String,
    pub playlist_name: String,
    pub playlist_position: String,
    pub downloaded_by: String,
    pub auto_delete: String,
    pub proxy: String,
    pub quality: String,
    pub notes: String,
    pub status: Status,
}

impl JournalRecord {
    /// Assembles a row from probe metadata and the request.
    ///
    /// `url` is the address that was actually downloaded, which for a
    /// playlist entry is the entry's own page rather than the playlist.
    pub fn new(
        info: &MediaInfo,
        request: &DownloadRequest,
        url: &str,
        file_path: Option<&Path>,
        status: Status,
    ) -> Self {
        let now = Local::now();

        let tags = match info.tags.as_deref() {
            Some(tags) if !tags.is_empty() => tags
                .iter()
                .take(MAX_TAGS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => "No tags".to_string(),
        };

        let playlist_name = info
            .playlist_title
            .clone()
            .unwrap_or_else(|| request.playlist_name.clone());

        Self {
            id: format!("{}_{:04}", now.format("%Y%m%d_%H%M%S"), url_hash(url) % 10_000),
            format: request.output_format.as_str().to_string(),
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            source: VideoSource::classify(url),
            url: url.to_string(),
            title: info
                .title
                .clone()
                .unwrap_or_else(|| "Unknown title".to_string()),
            tags,
            file_path: file_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            file_size_mb: file_path.map(file_size_mb).unwrap_or(0.0),
            duration: format_duration(info.duration),
            playlist_name,
            playlist_position: info
                .playlist_index
                .map(|i| i.to_string())
                .unwrap_or_default(),
            downloaded_by: request.downloaded_by.clone(),
            auto_delete: String::new(),
            proxy: if request.proxy_used { "Yes" } else { "No" }.to_string(),
            quality: request.quality.clone(),
            notes: request.notes.clone(),
            status,
        }
    }

    fn to_row(&self) -> [String; 18] {
        [
            self.id.clone(),
            self.format.clone(),
            self.timestamp.clone(),
            self.source.label().to_string(),
            self.url.clone(),
            self.title.clone(),
            self.tags.clone(),
            self.file_path.clone(),
            self.file_size_mb.to_string(),
            self.duration.clone(),
            self.playlist_name.clone(),
            self.playlist_position.clone(),
            self.downloaded_by.clone(),
            self.auto_delete.clone(),
            self.proxy.clone(),
            self.quality.clone(),
            self.notes.clone(),
            self.status.as_cell(),
        ]
    }
}

fn url_hash(url: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    hasher.finish()
}

/// Append-only CSV log of download attempts.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Opens the journal, writing the header if the file is new or empty.
    /// Returns the journal and whether it had to be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, bool), JournalError> {
        let journal = Self { path: path.into() };
        let created = journal.ensure_header()?;
        Ok((journal, created))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_header(&self) -> Result<bool, JournalError> {
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(self.io_error(e)),
        };
        if !needs_header {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(true)
    }

    pub fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        // Someone may have deleted the file since startup.
        self.ensure_header()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(record.to_row())?;
        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputFormat;
    use serde_json::json;
    use tempfile::tempdir;

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_open_creates_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");

        let (_, created) = Journal::open(&path).unwrap();
        assert!(created);
        let (_, created) = Journal::open(&path).unwrap();
        assert!(!created);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iter().collect::<Vec<_>>(), HEADER.to_vec());
    }

    #[test]
    fn test_append_writes_full_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, vec![0u8; 1024 * 1024]).unwrap();

        let (journal, _) = Journal::open(&path).unwrap();
        let info = MediaInfo::from_value(json!({
            "title": "Clip, with \"quotes\"",
            "duration": 125,
            "tags": ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"]
        }))
        .unwrap();
        let request = DownloadRequest::new("https://vimeo.com/1")
            .with_format(OutputFormat::Mp3)
            .with_notes("multi\nline");

        let record = JournalRecord::new(&info, &request, &request.url, Some(&media), Status::Success);
        journal.append(&record).unwrap();
        let failure = JournalRecord::new(
            &MediaInfo::default(),
            &request,
            &request.url,
            None,
            Status::failed("file not found"),
        );
        journal.append(&failure).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == HEADER.len()));

        let row = &rows[1];
        assert_eq!(&row[1], "mp3");
        assert_eq!(&row[3], "Vimeo");
        assert_eq!(&row[5], "Clip, with \"quotes\"");
        assert_eq!(&row[6], "a, b, c, d, e, f, g, h, i, j");
        assert_eq!(&row[8], "1");
        assert_eq!(&row[9], "02:05");
        assert_eq!(&row[14], "No");
        assert_eq!(&row[16], "multi\nline");
        assert_eq!(&row[17], "Success");

        let row = &rows[2];
        assert_eq!(&row[5], "Unknown title");
        assert_eq!(&row[6], "No tags");
        assert_eq!(&row[7], "");
        assert_eq!(&row[8], "0");
        assert_eq!(&row[9], "Unknown");
        assert_eq!(&row[17], "Error: file not found");
    }

    #[test]
    fn test_header_restored_after_deletion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let (journal, _) = Journal::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let request = DownloadRequest::new("https://example.com/v");
        let record = JournalRecord::new(&MediaInfo::default(), &request, &request.url, None, Status::Success);
        journal.append(&record).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "ID");
        assert_eq!(&rows[1][3], "Other");
    }

    #[test]
    fn test_record_id_shape() {
        let request = DownloadRequest::new("https://youtu.be/x");
        let record = JournalRecord::new(&MediaInfo::default(), &request, &request.url, None, Status::Success);
        let (stamp, suffix) = record.id.rsplit_once('_').unwrap();
        assert_eq!(stamp.len(), "20240101_120000".len());
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}

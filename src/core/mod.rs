pub mod backend;
pub mod downloader;
pub mod journal;
pub mod metadata;
pub mod options;
pub mod request;
pub mod source;

pub use backend::{MediaBackend, YtDlpBackend};
pub use downloader::{DownloadReport, Downloader};
pub use journal::{Journal, JournalRecord, Status};
pub use metadata::{MediaInfo, VideoFormat};
pub use options::{OutputFormat, YdlOptions};
pub use request::DownloadRequest;
pub use source::VideoSource;

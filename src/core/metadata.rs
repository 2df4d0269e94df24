use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Metadata document produced by a yt-dlp information probe.
///
/// Only the keys the downloader reads are typed; everything else is kept in
/// `extra` so the platform checks can look for error markers anywhere in the
/// document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Outer `None` means the key was absent, inner `None` that it was null.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub uploader: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub channel: Option<Option<String>>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<VideoFormat>>,
    #[serde(default)]
    pub playlist_title: Option<String>,
    #[serde(default)]
    pub playlist_index: Option<u64>,
    /// Present only on playlists. Entries yt-dlp could not resolve are null.
    #[serde(default)]
    pub entries: Option<Vec<Option<MediaInfo>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const UNKNOWN_CHANNEL: &str = "Unknown_Channel";

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoFormat {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MediaInfo {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }

    pub fn has_formats(&self) -> bool {
        self.formats.as_ref().is_some_and(|f| !f.is_empty())
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Uploader, falling back to the channel name.
    pub fn uploader_or_channel(&self) -> Option<&str> {
        fn non_empty(field: &Option<Option<String>>) -> Option<&str> {
            field.as_ref().and_then(|v| v.as_deref()).filter(|s| !s.is_empty())
        }
        non_empty(&self.uploader).or_else(|| non_empty(&self.channel))
    }

    /// Name used to prefix the output file.
    ///
    /// Only a missing `uploader` key falls back to `channel`, and only a
    /// missing `channel` key to [`UNKNOWN_CHANNEL`]. A key that is present but
    /// null or empty means the file gets no prefix.
    pub fn naming_uploader(&self) -> Option<&str> {
        let chosen = match (&self.uploader, &self.channel) {
            (Some(uploader), _) => uploader.as_deref(),
            (None, Some(channel)) => channel.as_deref(),
            (None, None) => Some(UNKNOWN_CHANNEL),
        };
        chosen.filter(|s| !s.is_empty())
    }

    /// URL to hand back to yt-dlp when downloading this item on its own.
    pub fn download_url(&self) -> Option<&str> {
        self.webpage_url
            .as_deref()
            .or(self.url.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Case-insensitive search through the whole document, keys included.
    pub fn text_contains(&self, needle: &str) -> bool {
        serde_json::to_string(self)
            .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform a URL belongs to, as far as the journal is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoSource {
    YouTube,
    TikTok,
    Facebook,
    Instagram,
    Twitter,
    Vk,
    Twitch,
    Reddit,
    SoundCloud,
    Bandcamp,
    Vimeo,
    Dailymotion,
    Spotify,
    Other,
}

// First match wins, so more specific fragments must come before looser ones.
const SOURCE_TABLE: &[(&[&str], VideoSource)] = &[
    (
        &["youtube.com", "youtu.be", "youtube-nocookie.com"],
        VideoSource::YouTube,
    ),
    (&["tiktok.com"], VideoSource::TikTok),
    (&["facebook.com", "fb.watch", "fb.com"], VideoSource::Facebook),
    (&["instagram.com", "instagr.am"], VideoSource::Instagram),
    (&["vk.com", "vk.ru"], VideoSource::Vk),
    (&["twitch.tv"], VideoSource::Twitch),
    (&["reddit.com", "redd.it"], VideoSource::Reddit),
    (&["soundcloud.com"], VideoSource::SoundCloud),
    (&["bandcamp.com"], VideoSource::Bandcamp),
    (&["vimeo.com"], VideoSource::Vimeo),
    (&["dailymotion.com"], VideoSource::Dailymotion),
    (&["spotify.com", "open.spotify.com"], VideoSource::Spotify),
    // "t.co" and "x.com" also occur inside other hosts (reddit.com)
    (&["twitter.com", "x.com", "t.co"], VideoSource::Twitter),
];

impl VideoSource {
    /// Classifies a URL by case-insensitive hostname fragments.
    pub fn classify(url: &str) -> Self {
        let url = url.to_lowercase();
        SOURCE_TABLE
            .iter()
            .find(|(fragments, _)| fragments.iter().any(|f| url.contains(f)))
            .map(|(_, source)| *source)
            .unwrap_or(VideoSource::Other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            VideoSource::YouTube => "YouTube",
            VideoSource::TikTok => "TikTok",
            VideoSource::Facebook => "Facebook",
            VideoSource::Instagram => "Instagram",
            VideoSource::Twitter => "Twitter/X",
            VideoSource::Vk => "VK",
            VideoSource::Twitch => "Twitch",
            VideoSource::Reddit => "Reddit",
            VideoSource::SoundCloud => "SoundCloud",
            VideoSource::Bandcamp => "Bandcamp",
            VideoSource::Vimeo => "Vimeo",
            VideoSource::Dailymotion => "Dailymotion",
            VideoSource::Spotify => "Spotify",
            VideoSource::Other => "Other",
        }
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

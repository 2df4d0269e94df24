use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MOBILE_SAFARI_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1";

/// Probe error fragments that mean the platform changed under yt-dlp and a
/// more conservative configuration may still work.
pub const FALLBACK_SIGNATURES: &[&str] = &[
    "cannot parse data",
    "sabr streaming",
    "formats have been skipped",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mp3,
    Webm,
    BestVideo,
    BestAudio,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Mp4,
        OutputFormat::Mp3,
        OutputFormat::Webm,
        OutputFormat::BestVideo,
        OutputFormat::BestAudio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Webm => "webm",
            OutputFormat::BestVideo => "best_video",
            OutputFormat::BestAudio => "best_audio",
        }
    }

    /// Menu number shown by the interactive prompt, starting at 1.
    pub fn from_choice(choice: &str) -> Option<Self> {
        let index: usize = choice.trim().parse().ok()?;
        Self::ALL.get(index.checked_sub(1)?).copied()
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "MP4 (video, up to 1080p)",
            OutputFormat::Mp3 => "MP3 (audio only, 192kbps)",
            OutputFormat::Webm => "WEBM (video)",
            OutputFormat::BestVideo => "Best video",
            OutputFormat::BestAudio => "Best audio",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, OutputFormat::Mp3 | OutputFormat::BestAudio)
    }

    pub fn selector(&self, max_height: u32) -> String {
        match self {
            OutputFormat::Mp4 => format!(
                "best[height<={max_height}][ext=mp4]/best[height<=720][ext=mp4]/best[ext=mp4]/best"
            ),
            OutputFormat::Webm => format!("best[ext=webm]/best[height<={max_height}]/best"),
            OutputFormat::BestVideo => {
                format!("best[height<={max_height}]/best[height<=720]/best")
            }
            OutputFormat::BestAudio => "bestaudio[ext=m4a]/bestaudio[ext=mp3]/bestaudio/best".to_string(),
            OutputFormat::Mp3 => "bestaudio[ext=m4a]/bestaudio/best".to_string(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: String,
    pub quality: Option<String>,
}

/// `extractor -> key -> comma separated values`, as `--extractor-args` wants it.
pub type ExtractorArgs = BTreeMap<String, BTreeMap<String, String>>;

/// Everything the downloader tells yt-dlp about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct YdlOptions {
    pub format: String,
    pub format_sort: Option<String>,
    pub output_template: String,
    pub retries: u32,
    pub fragment_retries: u32,
    pub extractor_retries: u32,
    pub file_access_retries: u32,
    pub http_chunk_size: u64,
    pub concurrent_fragments: u32,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub http_headers: BTreeMap<String, String>,
    pub extractor_args: ExtractorArgs,
    pub socket_timeout: u64,
    pub ignore_errors: bool,
    pub no_playlist: bool,
    pub playlist_end: Option<usize>,
    pub audio_extraction: Option<AudioExtraction>,
    pub write_subtitles: bool,
    pub write_auto_subtitles: bool,
    pub max_filesize_mb: Option<u64>,
    pub force_ipv6: bool,
    pub proxy: Option<String>,
}

fn extractor(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_extractor_args() -> ExtractorArgs {
    let mut args = ExtractorArgs::new();
    args.insert(
        "youtube".to_string(),
        extractor(&[
            ("player_client", "android,web,tv"),
            ("player_skip", "webpage,configs"),
            ("skip", "dash,hls"),
        ]),
    );
    args.insert(
        "instagram".to_string(),
        extractor(&[("api_version", "v1"), ("include_stories", "false")]),
    );
    args.insert("facebook".to_string(), facebook_extractor_args());
    args.insert(
        "tiktok".to_string(),
        extractor(&[
            ("webpage_download", "false"),
            ("api_hostname", "api.tiktokv.com"),
        ]),
    );
    args
}

fn facebook_extractor_args() -> BTreeMap<String, String> {
    extractor(&[
        ("tab", "videos"),
        ("bypass_age_gate", "true"),
        ("use_cookies", "true"),
    ])
}

fn default_http_headers() -> BTreeMap<String, String> {
    extractor(&[
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-us,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate"),
        ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
        ("Keep-Alive", "300"),
        ("Connection", "keep-alive"),
    ])
}

impl YdlOptions {
    /// Builds the options for one request.
    ///
    /// `playlist` switches the output template to a per-playlist layout and
    /// bounds the number of entries yt-dlp resolves.
    pub fn build(
        config: &AppConfig,
        download_dir: &Path,
        output_format: OutputFormat,
        playlist: Option<usize>,
    ) -> Self {
        let dir = download_dir.to_string_lossy();
        let output_template = match playlist {
            Some(_) if config.playlist.create_playlist_folders => format!(
                "{}/%(playlist_title)s/%(playlist_index)02d - %(title)s.%(ext)s",
                dir
            ),
            Some(_) => format!(
                "{}/%(playlist_title)s - %(playlist_index)02d - %(title)s.%(ext)s",
                dir
            ),
            None => format!("{}/%(uploader)s - %(title)s - %(id)s.%(ext)s", dir),
        };

        let format_sort = if output_format.is_audio() {
            format!("acodec:{}", config.quality.preferred_audio_codec)
        } else {
            format!("vcodec:{}", config.quality.preferred_video_codec)
        };

        let audio_extraction = match output_format {
            OutputFormat::Mp3 => Some(AudioExtraction {
                codec: "mp3".to_string(),
                quality: Some(config.quality.audio_quality.clone()),
            }),
            OutputFormat::BestAudio => Some(AudioExtraction {
                codec: "best".to_string(),
                quality: None,
            }),
            _ => None,
        };

        Self {
            format: output_format.selector(config.quality.max_video_height),
            format_sort: Some(format_sort),
            output_template,
            retries: config.network.retries,
            fragment_retries: config.network.retries,
            extractor_retries: 3,
            file_access_retries: 3,
            http_chunk_size: config.network.http_chunk_size,
            concurrent_fragments: config.download.max_concurrent_downloads,
            user_agent: Some(DESKTOP_USER_AGENT.to_string()),
            referer: Some("https://www.youtube.com/".to_string()),
            http_headers: default_http_headers(),
            extractor_args: default_extractor_args(),
            socket_timeout: config.network.socket_timeout,
            ignore_errors: true,
            no_playlist: playlist.is_none(),
            playlist_end: playlist,
            audio_extraction,
            write_subtitles: config.download.write_subtitles,
            write_auto_subtitles: config.download.write_auto_subtitles,
            max_filesize_mb: Some(config.download.max_file_size_mb).filter(|mb| *mb > 0),
            force_ipv6: config.network.prefer_ipv6,
            proxy: config.network.proxy.clone(),
        }
    }

    /// Relaxed configuration used for a second probe when the first one hit a
    /// known platform breakage. Chosen from substrings of `url`.
    pub fn fallback_for(&self, url: &str) -> Self {
        let url = url.to_lowercase();
        let mut fallback = self.clone();

        if url.contains("facebook") {
            fallback.format = "best[height<=720]/worst".to_string();
            fallback.extractor_args =
                ExtractorArgs::from([("facebook".to_string(), facebook_extractor_args())]);
            fallback.user_agent = Some(MOBILE_SAFARI_USER_AGENT.to_string());
            fallback.referer = Some("https://www.facebook.com/".to_string());
            fallback.http_headers = extractor(&[
                ("Accept-Language", "en-US,en;q=0.9"),
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
                ("DNT", "1"),
            ]);
        } else if url.contains("soundcloud") {
            fallback.format = "best".to_string();
            fallback.extractor_args = ExtractorArgs::from([(
                "soundcloud".to_string(),
                extractor(&[("use_oauth", "false")]),
            )]);
        } else if url.contains("youtube") || url.contains("youtu.be") {
            fallback.format = "best[height<=720]/best[height<=480]/worst".to_string();
            fallback.extractor_args = ExtractorArgs::from([(
                "youtube".to_string(),
                extractor(&[
                    ("player_client", "android_creator,android"),
                    ("player_skip", "webpage,configs,js"),
                    ("skip", "dash,hls"),
                ]),
            )]);
        } else {
            fallback.format = "best[height<=720]/worst".to_string();
            fallback.ignore_errors = true;
        }

        fallback
    }

    /// Translates the options into yt-dlp command-line arguments, URL excluded.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            self.format.clone(),
            "-o".into(),
            self.output_template.clone(),
            "--retries".into(),
            self.retries.to_string(),
            "--fragment-retries".into(),
            self.fragment_retries.to_string(),
            "--extractor-retries".into(),
            self.extractor_retries.to_string(),
            "--file-access-retries".into(),
            self.file_access_retries.to_string(),
            "--http-chunk-size".into(),
            self.http_chunk_size.to_string(),
            "--socket-timeout".into(),
            self.socket_timeout.to_string(),
        ];

        if let Some(sort) = &self.format_sort {
            args.extend(["-S".into(), sort.clone()]);
        }
        if self.concurrent_fragments > 1 {
            args.extend(["-N".into(), self.concurrent_fragments.to_string()]);
        }
        if let Some(ua) = &self.user_agent {
            args.extend(["--user-agent".into(), ua.clone()]);
        }
        if let Some(referer) = &self.referer {
            args.extend(["--referer".into(), referer.clone()]);
        }
        for (name, value) in &self.http_headers {
            args.extend(["--add-header".into(), format!("{}:{}", name, value)]);
        }
        for (name, values) in &self.extractor_args {
            if values.is_empty() {
                continue;
            }
            let joined = values
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(";");
            args.extend(["--extractor-args".into(), format!("{}:{}", name, joined)]);
        }

        if self.ignore_errors {
            args.push("-i".into());
        }
        if self.no_playlist {
            args.push("--no-playlist".into());
        } else {
            args.push("--yes-playlist".into());
        }
        if let Some(end) = self.playlist_end {
            args.extend(["--playlist-end".into(), end.to_string()]);
        }

        if let Some(audio) = &self.audio_extraction {
            args.extend(["-x".into(), "--audio-format".into(), audio.codec.clone()]);
            if let Some(quality) = &audio.quality {
                args.extend(["--audio-quality".into(), quality.clone()]);
            }
        }

        if self.write_subtitles {
            args.push("--write-subs".into());
        }
        if self.write_auto_subtitles {
            args.push("--write-auto-subs".into());
        }
        if let Some(mb) = self.max_filesize_mb {
            args.extend(["--max-filesize".into(), format!("{}M", mb)]);
        }
        if self.force_ipv6 {
            args.push("--force-ipv6".into());
        }
        if let Some(proxy) = &self.proxy {
            args.extend(["--proxy".into(), proxy.clone()]);
        }

        args
    }
}

/// Whether a probe error is one the fallback configuration is meant for.
pub fn is_fallback_signature(message: &str) -> bool {
    let message = message.to_lowercase();
    FALLBACK_SIGNATURES.iter().any(|s| message.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_format_choice_menu() {
        assert_eq!(OutputFormat::from_choice("1"), Some(OutputFormat::Mp4));
        assert_eq!(OutputFormat::from_choice(" 2 "), Some(OutputFormat::Mp3));
        assert_eq!(OutputFormat::from_choice("5"), Some(OutputFormat::BestAudio));
        assert_eq!(OutputFormat::from_choice("0"), None);
        assert_eq!(OutputFormat::from_choice("6"), None);
        assert_eq!(OutputFormat::from_choice("mp4"), None);
    }

    #[test]
    fn test_selectors_use_configured_height() {
        assert_eq!(
            OutputFormat::Mp4.selector(1080),
            "best[height<=1080][ext=mp4]/best[height<=720][ext=mp4]/best[ext=mp4]/best"
        );
        assert_eq!(
            OutputFormat::BestVideo.selector(480),
            "best[height<=480]/best[height<=720]/best"
        );
        assert_eq!(OutputFormat::Mp3.selector(1080), "bestaudio[ext=m4a]/bestaudio/best");
    }

    #[test]
    fn test_single_video_args() {
        let config = AppConfig::default();
        let opts = YdlOptions::build(&config, &PathBuf::from("Downloads"), OutputFormat::Mp4, None);
        let args = opts.to_args();

        assert_eq!(
            arg_after(&args, "-o"),
            Some("Downloads/%(uploader)s - %(title)s - %(id)s.%(ext)s")
        );
        assert_eq!(arg_after(&args, "--retries"), Some("5"));
        assert_eq!(arg_after(&args, "-S"), Some("vcodec:h264"));
        assert_eq!(arg_after(&args, "--max-filesize"), Some("500M"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"-i".to_string()));
        assert!(args.contains(&"--write-subs".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert!(args.contains(&"youtube:player_client=android,web,tv;player_skip=webpage,configs;skip=dash,hls".to_string()));
        assert!(args.contains(&"Keep-Alive:300".to_string()));
        assert_eq!(
            opts.extractor_args.keys().collect::<Vec<_>>(),
            vec!["facebook", "instagram", "tiktok", "youtube"]
        );
    }

    #[test]
    fn test_mp3_playlist_args() {
        let config = AppConfig::default();
        let opts = YdlOptions::build(&config, &PathBuf::from("out"), OutputFormat::Mp3, Some(20));
        let args = opts.to_args();

        assert_eq!(
            arg_after(&args, "-o"),
            Some("out/%(playlist_title)s/%(playlist_index)02d - %(title)s.%(ext)s")
        );
        assert_eq!(arg_after(&args, "--playlist-end"), Some("20"));
        assert_eq!(arg_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(arg_after(&args, "--audio-quality"), Some("192"));
        assert_eq!(arg_after(&args, "-S"), Some("acodec:aac"));
        assert!(args.contains(&"--yes-playlist".to_string()));
    }

    #[test]
    fn test_flat_playlist_layout() {
        let mut config = AppConfig::default();
        config.playlist.create_playlist_folders = false;
        let opts = YdlOptions::build(&config, &PathBuf::from("out"), OutputFormat::Webm, Some(3));
        assert_eq!(
            opts.output_template,
            "out/%(playlist_title)s - %(playlist_index)02d - %(title)s.%(ext)s"
        );
    }

    #[test]
    fn test_fallback_per_platform() {
        let config = AppConfig::default();
        let base = YdlOptions::build(&config, &PathBuf::from("d"), OutputFormat::Mp4, None);

        let fb = base.fallback_for("https://www.facebook.com/watch/?v=1234567890123456");
        assert_eq!(fb.format, "best[height<=720]/worst");
        assert_eq!(fb.user_agent.as_deref(), Some(MOBILE_SAFARI_USER_AGENT));
        assert_eq!(fb.referer.as_deref(), Some("https://www.facebook.com/"));
        assert_eq!(fb.extractor_args.keys().collect::<Vec<_>>(), vec!["facebook"]);

        let yt = base.fallback_for("https://youtu.be/abc");
        assert_eq!(yt.format, "best[height<=720]/best[height<=480]/worst");
        assert_eq!(
            yt.extractor_args["youtube"]["player_client"],
            "android_creator,android"
        );
        assert_eq!(yt.output_template, base.output_template);

        let sc = base.fallback_for("https://soundcloud.com/a/b");
        assert_eq!(sc.format, "best");
        assert_eq!(sc.extractor_args["soundcloud"]["use_oauth"], "false");

        let other = base.fallback_for("https://vimeo.com/1");
        assert_eq!(other.format, "best[height<=720]/worst");
        assert!(other.ignore_errors);
        assert_eq!(other.extractor_args, base.extractor_args);
    }

    #[test]
    fn test_fallback_signatures() {
        assert!(is_fallback_signature("ERROR: [youtube] x: Cannot parse data; please report"));
        assert!(is_fallback_signature("WARNING: SABR streaming is not supported"));
        assert!(is_fallback_signature("Some web formats have been skipped"));
        assert!(!is_fallback_signature("HTTP Error 404: Not Found"));
    }
}

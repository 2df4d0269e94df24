use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

pub const PLACEHOLDER_NAME: &str = "Unknown_Video";
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 180;

/// How old a file may be and still count as "just downloaded".
pub const RECENT_FILE_WINDOW: Duration = Duration::from_secs(120);

// Only real HTML elements count as markup, so "<Cool>" in a title keeps its word.
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:a|abbr|b|big|blockquote|br|code|del|div|em|font|h[1-6]|hr|i|img|ins|li|mark|ol|p|pre|q|s|small|span|strike|strong|sub|sup|u|ul)(?:\s[^<>]*)?/?>",
    )
    .expect("valid markup regex")
});
static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid invalid-chars regex"));
static SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-.()\[\]{}]").expect("valid symbols regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static FACEBOOK_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/reel/(\d{15,16})",
        r"/watch/\?v=(\d{15,16})",
        r"/videos/(\d{15,16})",
        r"fb\.watch/[^/]+.*?(\d{15,16})",
        r"video_id[=:](\d{15,16})",
        r"\b(\d{15,16})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid facebook pattern"))
    .collect()
});

/// Turns a media title into something every common filesystem accepts.
///
/// Strips markup, reserved characters and emoji-like symbols, collapses
/// whitespace, drops trailing dots and keeps whole words up to `max_length`
/// characters. Never returns an empty string.
pub fn sanitize_filename(filename: &str, max_length: usize) -> String {
    let max_length = max_length.max(1);

    let cleaned = MARKUP_TAG.replace_all(filename, "");
    let cleaned = INVALID_CHARS.replace_all(&cleaned, "");
    let cleaned = SYMBOLS.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim().trim_end_matches('.');

    let truncated = truncate_on_words(cleaned, max_length);
    let result = truncated.trim_end_matches(['.', ' ']);

    if result.is_empty() {
        PLACEHOLDER_NAME.chars().take(max_length).collect()
    } else {
        result.to_string()
    }
}

fn truncate_on_words(name: &str, max_length: usize) -> String {
    if name.chars().count() <= max_length {
        return name.to_string();
    }

    let mut words = name.split(' ');
    // A single overlong word is cut hard rather than overflowing the limit.
    let mut result: String = words
        .next()
        .map(|w| w.chars().take(max_length).collect())
        .unwrap_or_default();
    let mut len = result.chars().count();

    for word in words {
        let word_len = word.chars().count();
        if len + 1 + word_len > max_length {
            break;
        }
        result.push(' ');
        result.push_str(word);
        len += 1 + word_len;
    }
    result
}

pub fn is_facebook_url(url: &str) -> bool {
    let url = url.to_lowercase();
    url.contains("facebook.com") || url.contains("fb.watch")
}

/// Rewrites reel, video and fb.watch links into the `watch/?v=<id>` form
/// yt-dlp handles best. Non-Facebook URLs pass through untouched, as do
/// Facebook URLs with no recognisable video id.
pub fn fix_facebook_url(url: &str) -> String {
    if !is_facebook_url(url) {
        return url.to_string();
    }

    for pattern in FACEBOOK_ID_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(url) {
            let fixed = format!("https://www.facebook.com/watch/?v={}", &captures[1]);
            if fixed != url {
                info!("Rewrote Facebook URL {} -> {}", url, fixed);
            }
            return fixed;
        }
    }

    warn!("Could not find a video id in Facebook URL: {}", url);
    info!("Try the facebook.com/watch/?v=<id> form by hand");
    url.to_string()
}

/// `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s >= 1.0 => s as u64,
        _ => return "Unknown".to_string(),
    };
    let (hours, rest) = (total / 3600, total % 3600);
    let (minutes, secs) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

pub fn file_size_mb(path: &Path) -> f64 {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => (meta.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn match_in_dir(dir: &Path, ext: &str, candidates: &[&str]) -> Option<PathBuf> {
    for candidate in candidates.iter().filter(|c| !c.is_empty()) {
        let candidate = candidate.to_lowercase();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return None;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if path.is_file() && name.contains(&candidate) && has_extension(&path, ext) {
                return Some(path);
            }
        }
    }
    None
}

fn newest_recent_file(download_dir: &Path, ext: &str) -> Option<PathBuf> {
    let pattern = format!(
        "{}/**/*.{}",
        glob::Pattern::escape(&download_dir.to_string_lossy()),
        ext
    );
    let newest = glob::glob(&pattern)
        .ok()?
        .flatten()
        .filter(|p| p.is_file())
        .filter_map(|p| {
            let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((modified, p))
        })
        .max_by_key(|(modified, _)| *modified)?;

    let age = SystemTime::now()
        .duration_since(newest.0)
        .unwrap_or(Duration::ZERO);
    (age < RECENT_FILE_WINDOW).then_some(newest.1)
}

/// Recovers the path yt-dlp wrote to, since it does not report it back.
///
/// Looks for a file with extension `ext` whose name contains one of
/// `candidates` (in order), first in `playlist_dir` then in `download_dir`.
/// Failing that, takes the newest `*.ext` anywhere under `download_dir` if it
/// was modified within [`RECENT_FILE_WINDOW`].
pub fn find_downloaded_file(
    download_dir: &Path,
    ext: &str,
    candidates: &[&str],
    playlist_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(dir) = playlist_dir.filter(|d| d.is_dir()) {
        if let Some(found) = match_in_dir(dir, ext, candidates) {
            return Some(found);
        }
    }
    match_in_dir(download_dir, ext, candidates).or_else(|| newest_recent_file(download_dir, ext))
}

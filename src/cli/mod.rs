use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::core::request::looks_like_playlist;
use crate::core::{DownloadRequest, Downloader, OutputFormat, VideoSource, YtDlpBackend};
use crate::error::BackendError;
use crate::logging;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use url::Url;

const RULE: &str = "======================================================================";

#[derive(Parser)]
#[command(name = "social-dl")]
#[command(about = "Download videos and audio from social platforms and keep a journal of every download")]
#[command(version)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Download directory, overriding the settings file
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Write a settings file with the default values and exit
    #[arg(long)]
    pub init_config: bool,

    /// Do not offer to update yt-dlp at startup
    #[arg(long)]
    pub skip_update_check: bool,
}

/// Line-oriented question/answer helper over any async input.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: AsyncBufRead + Unpin, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", line.as_ref())
    }

    /// Prints `question` and reads one trimmed line. Closed input reads as an
    /// empty answer.
    pub async fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line).await?;
        Ok(line.trim().to_string())
    }

    /// Yes/no question. An empty or unrecognised answer takes `default`.
    pub async fn confirm(&mut self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        let answer = self.ask(&format!("{} {}: ", question, hint)).await?;
        Ok(match answer.to_lowercase().as_str() {
            "y" | "yes" | "да" => true,
            "n" | "no" | "нет" => false,
            _ => default,
        })
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Accepts full URLs and scheme-less ones like `youtu.be/abc`.
fn normalize_url(input: &str) -> Option<String> {
    if let Ok(url) = Url::parse(input) {
        if url.has_host() {
            return Some(input.to_string());
        }
    }
    Url::parse(&format!("https://{}", input))
        .ok()
        .filter(|url| url.host_str().is_some_and(|h| h.contains('.')))
        .map(|url| url.to_string())
}

/// Asks for everything one download needs. `None` means the user backed out.
pub async fn collect_request<R, W>(
    prompter: &mut Prompter<R, W>,
    config: &AppConfig,
) -> io::Result<Option<DownloadRequest>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let input = prompter.ask("Enter a video or playlist URL: ").await?;
    if input.is_empty() {
        prompter.say("URL cannot be empty!")?;
        return Ok(None);
    }
    let Some(url) = normalize_url(&input) else {
        prompter.say(format!("Not a valid URL: {}", input))?;
        return Ok(None);
    };

    let source = VideoSource::classify(&url);
    prompter.say(format!("\nDetected source: {}", source))?;

    if source == VideoSource::Facebook {
        prompter.say("\nNOTE: Facebook downloads work best with this URL form:")?;
        prompter.say("   https://www.facebook.com/watch/?v=VIDEO_ID")?;
        prompter.say("The link will be rewritten automatically when possible.")?;
        if !prompter.confirm("\nContinue with the download?", true).await? {
            prompter.say("Try finding the same content on YouTube or SoundCloud")?;
            return Ok(None);
        }
    }

    prompter.say("\nChoose a format:")?;
    for (i, format) in OutputFormat::ALL.iter().enumerate() {
        prompter.say(format!("{}. {}", i + 1, format.description()))?;
    }
    let choice = prompter
        .ask(&format!("Enter a number (1-{}): ", OutputFormat::ALL.len()))
        .await?;
    let output_format = OutputFormat::from_choice(&choice).unwrap_or_default();

    let mut request = DownloadRequest::new(url)
        .with_format(output_format)
        .with_downloaded_by(config.download.downloaded_by.clone())
        .with_proxy(config.network.proxy.is_some());

    if looks_like_playlist(&request.url) {
        let wanted = prompter
            .confirm(
                "\nPlaylist detected. Download the whole playlist?",
                config.playlist.download_playlists_by_default,
            )
            .await?;
        if wanted {
            let default_max = config.playlist.max_playlist_items;
            let answer = prompter
                .ask(&format!("Maximum number of videos (default {}): ", default_max))
                .await?;
            let max = answer
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or(default_max);
            request = request.with_playlist(max);
        }
    }

    let notes = prompter.ask("Notes (optional): ").await?;
    Ok(Some(request.with_notes(notes)))
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        if self.init_config {
            if AppConfig::write_default(&self.config)? {
                println!("Wrote default settings to {}", self.config.display());
            } else {
                println!("{} already exists, leaving it alone", self.config.display());
            }
            return Ok(());
        }

        println!("Social media downloader v{}", env!("CARGO_PKG_VERSION"));
        println!("{}", RULE);

        let config = match AppConfig::load(&self.config) {
            Ok(config) => {
                println!(
                    "Settings loaded, download directory: {}",
                    config.download.download_directory.display()
                );
                config
            }
            Err(e) => {
                println!("Warning: {}", e);
                println!("Using default settings");
                AppConfig::default()
            }
        };

        let _log_guard = logging::init(&config.logging, self.verbose)?;
        info!("Starting social-dl v{}", env!("CARGO_PKG_VERSION"));

        let backend = YtDlpBackend::new(config.download.ytdlp_path.clone());
        match backend.version().await {
            Ok(version) => println!("yt-dlp version: {}", version),
            Err(e @ BackendError::NotInstalled(_)) => {
                println!("Error: {}", e);
                println!("Install it with `pip install yt-dlp` or from https://github.com/yt-dlp/yt-dlp,");
                println!("or point download_settings.ytdlp_path at the binary.");
                return Err(e.into());
            }
            Err(e) => println!("Warning: could not determine yt-dlp version: {}", e),
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let mut prompter = Prompter::new(stdin, io::stdout());

        if !self.skip_update_check
            && prompter.confirm("\nUpdate yt-dlp to the latest version?", false).await?
        {
            match backend.self_update().await {
                Ok(()) => println!("yt-dlp is up to date"),
                Err(e) => println!("Update failed: {}", e),
            }
        }
        println!("\n{}", RULE);

        let Some(mut request) = collect_request(&mut prompter, &config).await? else {
            return Ok(());
        };
        println!("\n{}", RULE);

        let downloader = Downloader::new(Box::new(backend), config, self.download_dir.clone())?;
        let report = downloader.download(&mut request).await;

        if report.is_success() {
            println!("\nDone!");
            if request.download_playlist {
                println!(
                    "Downloaded {} of {} playlist items",
                    report.succeeded,
                    report.succeeded + report.failed
                );
            }
            println!("Files saved to: {}", downloader.download_dir().display());
            println!("Journal: {}", downloader.journal().path().display());
        } else {
            println!("\nThe download failed, see the log for details");
        }

        Ok(())
    }
}

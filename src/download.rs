//! Fetching remote videos.
//!
//! [`YtDlpDownloader`] shells out to `yt-dlp`, which understands the short
//! video platforms this crate is aimed at. Any other fetcher can be plugged
//! into the [`Pipeline`](crate::Pipeline) through [`Downloader`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::KeyscribeError;
use crate::source::Downloader;

/// Format selector asking for a single progressive MP4 when available.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

/// Downloads videos with the `yt-dlp` command-line tool.
///
/// Files land in `output_dir` as `<video id>.<ext>`; the path printed by
/// `yt-dlp` after post-processing is returned.
///
/// # Example
///
/// ```no_run
/// use keyscribe::{Downloader, YtDlpDownloader};
///
/// let downloader = YtDlpDownloader::new(std::env::temp_dir());
/// let path = downloader.fetch("https://www.tiktok.com/@user/video/123")?;
/// println!("saved to {}", path.display());
/// # Ok::<(), keyscribe::KeyscribeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    binary: PathBuf,
    output_dir: PathBuf,
    format: String,
}

impl YtDlpDownloader {
    /// Download into `output_dir` with `yt-dlp` from `PATH`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            output_dir: output_dir.into(),
            format: DEFAULT_FORMAT.to_string(),
        }
    }

    /// Use a specific `yt-dlp` executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Replace the `-f` format selector.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Directory downloads are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl Downloader for YtDlpDownloader {
    fn fetch(&self, url: &str) -> Result<PathBuf, KeyscribeError> {
        let unreachable = |reason: String| KeyscribeError::UnreachableSource {
            url: url.to_string(),
            reason,
        };

        if !is_http_url(url) {
            return Err(unreachable("only http(s) URLs can be downloaded".to_string()));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let template = self.output_dir.join("%(id)s.%(ext)s");

        log::debug!("Downloading {url} into {}", self.output_dir.display());

        let output = Command::new(&self.binary)
            .arg("--no-playlist")
            .arg("--no-progress")
            .arg("-f")
            .arg(&self.format)
            .arg("-o")
            .arg(&template)
            .arg("--print")
            .arg("after_move:filepath")
            .arg(url)
            .output()
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    unreachable(format!(
                        "{} not found; install yt-dlp or pass its path",
                        self.binary.display()
                    ))
                } else {
                    unreachable(error.to_string())
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            if stderr.contains("Unsupported URL") {
                return Err(KeyscribeError::UnsupportedFormat(format!(
                    "no extractor for {url}"
                )));
            }
            if stderr.contains("Requested format is not available") {
                return Err(KeyscribeError::UnsupportedFormat(format!(
                    "{url} offers no format matching {}",
                    self.format
                )));
            }
            return Err(unreachable(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                last_line(&stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| unreachable("yt-dlp did not report a file path".to_string()))?;

        if !path.exists() {
            return Err(unreachable(format!(
                "yt-dlp reported {} but the file does not exist",
                path.display()
            )));
        }

        log::debug!("Downloaded {url} to {}", path.display());
        Ok(path)
    }
}

/// `true` for `http://` and `https://` URLs.
pub fn is_http_url(input: &str) -> bool {
    let lower = input.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn last_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .unwrap_or("")
}

//! Selection output.
//!
//! A [`KeyframeResult`] owns the selected frames, their recognized text and
//! any per-entry warnings. [`KeyframeResult::to_json`] renders the report
//! consumed by presentation layers:
//!
//! ```json
//! {
//!   "video_duration_seconds": 10.0,
//!   "frame_count_selected": 3,
//!   "frames": [
//!     { "timestamp_seconds": 0.0, "text": "" },
//!     { "timestamp_seconds": 5.133, "text": "SALE" },
//!     { "timestamp_seconds": 9.8, "text": "", "warning": "text recognition timed out after 5s" }
//!   ]
//! }
//! ```
//!
//! `frames` is always in ascending timestamp order.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use serde::Serialize;

use crate::error::KeyscribeError;
use crate::selection::SelectionOrigin;

/// Why an entry carries no text even though recognition was attempted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EntryWarning {
    /// The OCR engine returned an error.
    RecognitionFailed(String),
    /// The OCR engine did not answer within the configured timeout.
    RecognitionTimedOut(Duration),
}

impl Display for EntryWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EntryWarning::RecognitionFailed(reason) => {
                write!(f, "text recognition failed: {reason}")
            }
            EntryWarning::RecognitionTimedOut(timeout) => {
                write!(f, "text recognition timed out after {timeout:?}")
            }
        }
    }
}

/// One selected keyframe.
#[derive(Debug, Clone)]
pub struct KeyframeEntry {
    /// Presentation time of the frame.
    pub timestamp: Duration,
    /// Frame number of the frame.
    pub frame_number: u64,
    /// The decoded frame.
    pub image: DynamicImage,
    /// Recognized text; empty when nothing was found or recognition failed.
    pub text: String,
    /// `text` split into lines.
    pub lines: Vec<String>,
    /// Why the frame was picked.
    pub origin: SelectionOrigin,
    /// Dissimilarity to the previous sample, when there was one.
    pub score: Option<f64>,
    /// Set when recognition failed or timed out.
    pub warning: Option<EntryWarning>,
}

impl KeyframeEntry {
    /// `true` when recognition failed or timed out for this frame.
    pub fn has_warning(&self) -> bool {
        self.warning.is_some()
    }
}

/// Representative keyframes of one video, in ascending timestamp order.
#[derive(Debug, Clone)]
#[must_use]
pub struct KeyframeResult {
    video_duration: Duration,
    entries: Vec<KeyframeEntry>,
}

#[derive(Serialize)]
struct Report<'a> {
    video_duration_seconds: f64,
    frame_count_selected: usize,
    frames: Vec<ReportEntry<'a>>,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    timestamp_seconds: f64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl KeyframeResult {
    /// Assemble a result. Entries are sorted by timestamp.
    pub(crate) fn new(video_duration: Duration, mut entries: Vec<KeyframeEntry>) -> Self {
        entries.sort_by_key(|entry| entry.timestamp);
        Self {
            video_duration,
            entries,
        }
    }

    /// Duration of the analysed video.
    pub fn video_duration(&self) -> Duration {
        self.video_duration
    }

    /// The selected keyframes.
    pub fn entries(&self) -> &[KeyframeEntry] {
        &self.entries
    }

    /// Number of selected keyframes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selected timestamps, ascending.
    pub fn timestamps(&self) -> Vec<Duration> {
        self.entries.iter().map(|entry| entry.timestamp).collect()
    }

    /// Take ownership of the entries.
    pub fn into_entries(self) -> Vec<KeyframeEntry> {
        self.entries
    }

    fn report(&self) -> Report<'_> {
        Report {
            video_duration_seconds: self.video_duration.as_secs_f64(),
            frame_count_selected: self.entries.len(),
            frames: self
                .entries
                .iter()
                .map(|entry| ReportEntry {
                    timestamp_seconds: entry.timestamp.as_secs_f64(),
                    text: &entry.text,
                    warning: entry.warning.as_ref().map(ToString::to_string),
                })
                .collect(),
        }
    }

    /// The JSON report as a [`serde_json::Value`].
    pub fn to_json_value(&self) -> Result<serde_json::Value, KeyscribeError> {
        Ok(serde_json::to_value(self.report())?)
    }

    /// The JSON report as a compact string.
    pub fn to_json(&self) -> Result<String, KeyscribeError> {
        Ok(serde_json::to_string(&self.report())?)
    }

    /// The JSON report, pretty-printed.
    pub fn to_json_pretty(&self) -> Result<String, KeyscribeError> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }

    /// Save every keyframe image into `directory` as
    /// `keyframe_<index>_<millis>ms.<extension>` and return the paths.
    ///
    /// The image format is inferred from `extension` (e.g. `"png"`, `"jpg"`).
    pub fn save_images<P: AsRef<Path>>(
        &self,
        directory: P,
        extension: &str,
    ) -> Result<Vec<PathBuf>, KeyscribeError> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;
        let extension = extension.trim_start_matches('.');
        let mut paths = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            let path = directory.join(format!(
                "keyframe_{index:02}_{:08}ms.{extension}",
                entry.timestamp.as_millis()
            ));
            if extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg") {
                // JPEG has no alpha channel.
                DynamicImage::ImageRgb8(entry.image.to_rgb8()).save(&path)?;
            } else {
                entry.image.save(&path)?;
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

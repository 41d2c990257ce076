//! # keyscribe
//!
//! Pick a handful of representative keyframes from a short video and read
//! the text shown on them.
//!
//! `keyscribe` samples the video, scores how much each sample differs from
//! the previous one, keeps the strongest well-separated shot changes,
//! backfills evenly spaced frames when the video has too few cuts, and runs
//! OCR on every chosen frame. The result is a small, timestamp-ordered list
//! of frames with their captions, ready to be rendered as JSON.
//!
//! ## Quick Start
//!
//! ### Select keyframes from a file
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keyscribe::{KeyframeSelector, MediaFile, TesseractRecognizer};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let selector = KeyframeSelector::new(Arc::new(TesseractRecognizer::new()));
//! let result = selector.select(&mut video)?;
//! println!("{}", result.to_json_pretty()?);
//! # Ok::<(), keyscribe::KeyscribeError>(())
//! ```
//!
//! ### Download and process a URL
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keyscribe::{Pipeline, TesseractRecognizer, YtDlpDownloader};
//!
//! let pipeline = Pipeline::ffmpeg(
//!     Arc::new(YtDlpDownloader::new("downloads")),
//!     Arc::new(TesseractRecognizer::new().with_language("eng")),
//! );
//! let result = pipeline.process_url("https://www.instagram.com/reel/abc/")?;
//! for entry in result.entries() {
//!     println!("{:.2}s {}", entry.timestamp.as_secs_f64(), entry.text);
//! }
//! # Ok::<(), keyscribe::KeyscribeError>(())
//! ```
//!
//! ### Frames already in memory
//!
//! ```
//! use std::sync::Arc;
//!
//! use image::DynamicImage;
//! use keyscribe::{FrameSequence, KeyscribeError, SelectionOptions, TextRecognizer};
//!
//! struct NoText;
//!
//! impl TextRecognizer for NoText {
//!     fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
//!         Ok(String::new())
//!     }
//! }
//!
//! let frames = vec![DynamicImage::new_rgb8(32, 18); 100];
//! let mut video = FrameSequence::new(frames, 10.0)?;
//! let result = keyscribe::select_keyframes(&mut video, Arc::new(NoText), &SelectionOptions::default())?;
//! assert_eq!(result.len(), 3);
//! # Ok::<(), KeyscribeError>(())
//! ```
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` (default) | `MediaFile`, `MediaProbe` and `FfmpegOpener` backed by FFmpeg |
//! | `rayon` | Recognize selected frames in parallel |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries. OCR through
//! [`TesseractRecognizer`] needs the `tesseract` binary, and
//! [`YtDlpDownloader`] needs `yt-dlp`.

pub mod config;
mod conversion;
pub mod download;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
#[cfg(feature = "ffmpeg")]
pub mod media_file;
pub mod metadata;
pub mod ocr;
#[cfg(feature = "rayon")]
mod parallel;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod scoring;
mod selection;
pub mod selector;
pub mod source;

pub use config::{
    DEFAULT_CHANGE_THRESHOLD, DEFAULT_MAX_COUNT, DEFAULT_MAX_SAMPLES, DEFAULT_MIN_COUNT,
    SelectionOptions,
};
pub use download::YtDlpDownloader;
pub use error::KeyscribeError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
#[cfg(feature = "ffmpeg")]
pub use media_file::{FfmpegOpener, MediaFile, MediaProbe};
pub use metadata::VideoMetadata;
pub use ocr::{TesseractRecognizer, TextCleanup, TextRecognizer};
pub use pipeline::Pipeline;
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo, SelectionStage};
pub use result::{EntryWarning, KeyframeEntry, KeyframeResult};
pub use scoring::{FrameSignature, ShotScore};
pub use selection::SelectionOrigin;
pub use selector::{KeyframeSelector, select_keyframes, shot_scores};
pub use source::{Downloader, FrameDecoder, FrameSequence, Prober, SourceOpener, VideoSource};

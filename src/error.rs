//! Error types for the `keyscribe` crate.
//!
//! This module defines [`KeyscribeError`], the unified error type returned by
//! all fallible operations in the crate, including the collaborator traits
//! (downloader, prober, frame decoder, OCR engine).
//!
//! Whether an error aborts a whole selection depends on where it happens:
//! a recognition failure on one selected frame is absorbed into a per-entry
//! warning, everything else reaching the selector is surfaced to the caller.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `keyscribe` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyscribeError {
    /// The video cannot be analysed (e.g. it has no frames).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The selection options are inconsistent.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The download source could not be reached or returned no content.
    #[error("Source {url} is unreachable: {reason}")]
    UnreachableSource {
        /// The URL that was requested.
        url: String,
        /// Why the download failed.
        reason: String,
    },

    /// The source exists but its content is not a supported video.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The prober could not read the media file.
    #[error("Failed to read media file at {path}: {reason}")]
    UnreadableMedia {
        /// Path handed to the prober.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    DecodeError(String),

    /// The requested timestamp lies outside the video.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(Duration),

    /// The OCR engine failed on a frame.
    #[error("Text recognition failed: {0}")]
    RecognitionError(String),

    /// A collaborator call exceeded its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The report could not be serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for KeyscribeError {
    fn from(error: FfmpegError) -> Self {
        KeyscribeError::FfmpegError(error.to_string())
    }
}

//! Collaborator traits and the in-memory video source.
//!
//! The selector never talks to a concrete tool. It decodes through a
//! [`VideoSource`], and the [`Pipeline`](crate::Pipeline) reaches downloads
//! and probing through [`Downloader`], [`Prober`] and [`SourceOpener`].
//! FFmpeg-backed implementations live in [`media_file`](crate::media_file)
//! (feature `ffmpeg`); a `yt-dlp` downloader lives in
//! [`download`](crate::download).

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;

use crate::error::KeyscribeError;
use crate::metadata::VideoMetadata;

/// Fetches a remote video to a local file.
pub trait Downloader: Send + Sync {
    /// Download `url` and return the path of the local copy.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::UnreachableSource`] when nothing could be retrieved,
    /// [`KeyscribeError::UnsupportedFormat`] when the content is not a video.
    fn fetch(&self, url: &str) -> Result<PathBuf, KeyscribeError>;
}

/// Reads duration and stream facts from a video file.
pub trait Prober: Send + Sync {
    /// # Errors
    ///
    /// [`KeyscribeError::UnreadableMedia`] when the file cannot be read.
    fn probe(&self, path: &Path) -> Result<VideoMetadata, KeyscribeError>;
}

/// Decodes single frames at arbitrary timestamps.
///
/// Implementations must accept timestamps in any order; the selector scans
/// forward and then revisits the frames it picked.
pub trait FrameDecoder {
    /// Decode the frame shown at `timestamp`.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::DecodeError`] or
    /// [`KeyscribeError::InvalidTimestamp`].
    fn decode_frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, KeyscribeError>;
}

/// A decodable video: a [`FrameDecoder`] that knows its own metadata.
pub trait VideoSource: FrameDecoder {
    /// Metadata of the underlying video.
    fn metadata(&self) -> &VideoMetadata;
}

/// Turns a probed file into a [`VideoSource`].
pub trait SourceOpener: Send + Sync {
    /// Open `path`, reusing the metadata the prober already produced.
    fn open(
        &self,
        path: &Path,
        metadata: VideoMetadata,
    ) -> Result<Box<dyn VideoSource>, KeyscribeError>;
}

/// A video held entirely in memory as decoded frames.
///
/// Useful when frames come from somewhere other than a file (a capture
/// device, a previous pipeline stage) and for testing.
///
/// # Example
///
/// ```
/// use image::DynamicImage;
/// use keyscribe::{FrameSequence, VideoSource};
///
/// let frames = vec![DynamicImage::new_rgb8(16, 9); 20];
/// let sequence = FrameSequence::new(frames, 10.0).unwrap();
/// assert_eq!(sequence.metadata().frame_count, 20);
/// ```
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<DynamicImage>,
    metadata: VideoMetadata,
}

impl FrameSequence {
    /// Wrap `frames` shown at a constant `frames_per_second`.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::InvalidInput`] if the frame rate is not positive.
    pub fn new(frames: Vec<DynamicImage>, frames_per_second: f64) -> Result<Self, KeyscribeError> {
        if frames_per_second.is_nan() || frames_per_second <= 0.0 {
            return Err(KeyscribeError::InvalidInput(format!(
                "frame rate must be positive, got {frames_per_second}"
            )));
        }
        let frame_count = frames.len() as u64;
        let duration = Duration::from_secs_f64(frame_count as f64 / frames_per_second);
        let (width, height) = frames
            .first()
            .map(|frame| (frame.width(), frame.height()))
            .unwrap_or((0, 0));
        let metadata = VideoMetadata::new(duration, frames_per_second, frame_count)
            .with_dimensions(width, height)
            .with_codec("rawvideo");
        Ok(Self { frames, metadata })
    }

    /// Number of frames held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` when the sequence holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameDecoder for FrameSequence {
    fn decode_frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, KeyscribeError> {
        if timestamp > self.metadata.duration {
            return Err(KeyscribeError::InvalidTimestamp(timestamp));
        }
        let last = self.frames.len().checked_sub(1).ok_or_else(|| {
            KeyscribeError::DecodeError("frame sequence is empty".to_string())
        })?;
        let index = (self.metadata.frame_number_at(timestamp) as usize).min(last);
        Ok(self.frames[index].clone())
    }
}

impl VideoSource for FrameSequence {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

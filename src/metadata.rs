//! Video metadata.
//!
//! [`VideoMetadata`] is what a [`Prober`](crate::Prober) reports and what a
//! [`VideoSource`](crate::VideoSource) exposes to the selector.

use std::time::Duration;

use serde::Serialize;

/// Stream-level facts about a video.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use keyscribe::VideoMetadata;
///
/// let metadata = VideoMetadata::new(Duration::from_secs(10), 30.0, 300);
/// assert_eq!(metadata.timestamp_of(150), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Total duration of the video.
    #[serde(rename = "duration_seconds", serialize_with = "serialize_seconds")]
    pub duration: Duration,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Total number of frames, estimated from duration and frame rate.
    pub frame_count: u64,
    /// Frame width in pixels, `0` when unknown.
    pub width: u32,
    /// Frame height in pixels, `0` when unknown.
    pub height: u32,
    /// Codec name (e.g. `"h264"`), `"unknown"` when not reported.
    pub codec: String,
}

impl VideoMetadata {
    /// Metadata with only the fields the selector needs.
    pub fn new(duration: Duration, frames_per_second: f64, frame_count: u64) -> Self {
        Self {
            duration,
            frames_per_second,
            frame_count,
            width: 0,
            height: 0,
            codec: "unknown".to_string(),
        }
    }

    /// Set the frame dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Presentation time of `frame_number`, clamped to the duration.
    pub fn timestamp_of(&self, frame_number: u64) -> Duration {
        if self.frames_per_second <= 0.0 {
            return Duration::ZERO;
        }
        let timestamp = Duration::from_secs_f64(frame_number as f64 / self.frames_per_second);
        if self.duration > Duration::ZERO {
            timestamp.min(self.duration)
        } else {
            timestamp
        }
    }

    /// Frame number shown at `timestamp`.
    pub fn frame_number_at(&self, timestamp: Duration) -> u64 {
        crate::conversion::timestamp_to_frame_number(timestamp, self.frames_per_second)
    }
}

pub(crate) fn serialize_seconds<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

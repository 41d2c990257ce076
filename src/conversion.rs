//! Internal conversion helpers.
//!
//! Timestamp/frame-number arithmetic shared by the selector and the FFmpeg
//! backend, plus pixel copying out of FFmpeg frames.

use std::time::Duration;

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Convert a [`Duration`] to a frame number using the video's frame rate.
///
/// A tiny epsilon absorbs the rounding of `n / fps` round trips, so the
/// timestamp of frame `n` maps back to `n` rather than `n - 1`.
pub fn timestamp_to_frame_number(timestamp: Duration, frames_per_second: f64) -> u64 {
    if frames_per_second <= 0.0 {
        return 0;
    }
    (timestamp.as_secs_f64() * frames_per_second + 1e-6) as u64
}

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg rows may be padded (stride > width × 3); the padding is dropped so
/// the result can go straight into [`image::RgbImage::from_raw`].
#[cfg(feature = "ffmpeg")]
pub fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Container-level seek target in AV_TIME_BASE (microseconds).
#[cfg(feature = "ffmpeg")]
pub fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}

/// Rescale a PTS value from stream time base to seconds.
#[cfg(feature = "ffmpeg")]
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to a frame number.
#[cfg(feature = "ffmpeg")]
pub fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts_to_seconds(pts, time_base).max(0.0);
    (seconds * frames_per_second + 1e-6) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_numbers_survive_round_trip() {
        for frame in [0_u64, 1, 7, 29, 30, 150, 299] {
            let timestamp = Duration::from_secs_f64(frame as f64 / 30.0);
            assert_eq!(timestamp_to_frame_number(timestamp, 30.0), frame);
        }
    }

    #[test]
    fn zero_frame_rate_maps_to_first_frame() {
        assert_eq!(timestamp_to_frame_number(Duration::from_secs(3), 0.0), 0);
    }
}

//! FFmpeg-backed prober and frame decoder.
//!
//! [`MediaProbe`] implements [`Prober`] and [`MediaFile`] implements
//! [`VideoSource`], both through `ffmpeg-next`. [`FfmpegOpener`] connects
//! the two for the [`Pipeline`](crate::Pipeline).
//!
//! Available with the `ffmpeg` feature (enabled by default).

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::KeyscribeError;
use crate::metadata::VideoMetadata;
use crate::source::{FrameDecoder, Prober, SourceOpener, VideoSource};

/// Probes video files without keeping them open.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use keyscribe::{MediaProbe, Prober};
///
/// let metadata = MediaProbe.probe(Path::new("clip.mp4"))?;
/// println!("{:?} @ {} fps", metadata.duration, metadata.frames_per_second);
/// # Ok::<(), keyscribe::KeyscribeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaProbe;

impl Prober for MediaProbe {
    fn probe(&self, path: &Path) -> Result<VideoMetadata, KeyscribeError> {
        let (_, metadata, _) = open_input(path)?;
        Ok(metadata)
    }
}

/// An opened video file that decodes frames on demand.
///
/// Each [`decode_frame_at`](FrameDecoder::decode_frame_at) call seeks to the
/// nearest keyframe before the target and decodes forward, so calls may
/// come in any order.
pub struct MediaFile {
    input_context: Input,
    metadata: VideoMetadata,
    video_stream_index: usize,
    file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open and probe a video file.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::UnreadableMedia`] if the file cannot be opened or
    /// has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KeyscribeError> {
        let path = path.as_ref();
        let (input_context, metadata, video_stream_index) = open_input(path)?;
        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            file_path: path.to_path_buf(),
        })
    }

    /// Open a video file whose metadata a [`Prober`] already produced.
    ///
    /// The given metadata replaces what FFmpeg reports, so the selector sees
    /// exactly what the prober saw.
    pub fn open_with_metadata<P: AsRef<Path>>(
        path: P,
        metadata: VideoMetadata,
    ) -> Result<Self, KeyscribeError> {
        let mut file = Self::open(path)?;
        file.metadata = metadata;
        Ok(file)
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn decode_frame_number(&mut self, frame_number: u64) -> Result<DynamicImage, KeyscribeError> {
        let frames_per_second = self.metadata.frames_per_second;
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or_else(|| KeyscribeError::DecodeError("video stream disappeared".to_string()))?;
        let time_base = stream.time_base();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let (width, height) = (decoder.width(), decoder.height());
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let target_seconds = if frames_per_second > 0.0 {
            frame_number as f64 / frames_per_second
        } else {
            0.0
        };
        let target =
            crate::conversion::duration_to_seek_timestamp(Duration::from_secs_f64(target_seconds));
        self.input_context.seek(target, ..target)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();
        let stream_index = self.video_stream_index;

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|error| KeyscribeError::DecodeError(error.to_string()))?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().unwrap_or(0);
                let current =
                    crate::conversion::pts_to_frame_number(pts, time_base, frames_per_second);
                // Past the target means the exact frame does not exist; the
                // next one is the closest match after a seek.
                if current >= frame_number {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return rgb_frame_to_image(&rgb_frame, width, height);
                }
            }
        }

        decoder.send_eof()?;
        let mut last_decoded = false;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            last_decoded = true;
            let pts = decoded_frame.timestamp().unwrap_or(0);
            let current = crate::conversion::pts_to_frame_number(pts, time_base, frames_per_second);
            if current >= frame_number {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return rgb_frame_to_image(&rgb_frame, width, height);
            }
        }

        // Estimated frame counts overshoot on some containers: serve the
        // final frame for targets at the very end.
        if last_decoded {
            scaler.run(&decoded_frame, &mut rgb_frame)?;
            return rgb_frame_to_image(&rgb_frame, width, height);
        }

        Err(KeyscribeError::DecodeError(format!(
            "could not locate frame {frame_number} in {}",
            self.file_path.display()
        )))
    }
}

impl FrameDecoder for MediaFile {
    fn decode_frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, KeyscribeError> {
        if self.metadata.duration > Duration::ZERO && timestamp > self.metadata.duration {
            return Err(KeyscribeError::InvalidTimestamp(timestamp));
        }
        let frame_number = self.metadata.frame_number_at(timestamp);
        log::debug!("Decoding frame {frame_number} ({timestamp:?})");
        self.decode_frame_number(frame_number)
    }
}

impl VideoSource for MediaFile {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

/// Opens probed files as [`MediaFile`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl SourceOpener for FfmpegOpener {
    fn open(
        &self,
        path: &Path,
        metadata: VideoMetadata,
    ) -> Result<Box<dyn VideoSource>, KeyscribeError> {
        Ok(Box::new(MediaFile::open_with_metadata(path, metadata)?))
    }
}

/// Open `path`, locate its best video stream and read its metadata.
fn open_input(path: &Path) -> Result<(Input, VideoMetadata, usize), KeyscribeError> {
    let unreadable = |reason: String| KeyscribeError::UnreadableMedia {
        path: path.to_path_buf(),
        reason,
    };

    log::debug!("Opening media file: {}", path.display());

    ffmpeg_next::init().map_err(|error| unreadable(format!("FFmpeg initialisation failed: {error}")))?;
    let input_context =
        ffmpeg_next::format::input(&path).map_err(|error| unreadable(error.to_string()))?;

    let stream = input_context
        .streams()
        .best(Type::Video)
        .ok_or_else(|| unreadable("no video stream found".to_string()))?;
    let video_stream_index = stream.index();

    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| unreadable(format!("cannot create video decoder: {error}")))?;

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() > 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        let rate = stream.rate();
        if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        }
    };

    // Prefer the container duration, fall back to the stream's own.
    let container_duration = input_context.duration();
    let duration = if container_duration > 0 {
        Duration::from_micros(container_duration as u64)
    } else if stream.duration() > 0 {
        Duration::from_secs_f64(
            crate::conversion::pts_to_seconds(stream.duration(), stream.time_base()).max(0.0),
        )
    } else {
        Duration::ZERO
    };

    let frame_count = if stream.frames() > 0 {
        stream.frames() as u64
    } else if frames_per_second > 0.0 {
        (duration.as_secs_f64() * frames_per_second) as u64
    } else {
        0
    };

    let codec = decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let metadata = VideoMetadata::new(duration, frames_per_second, frame_count)
        .with_dimensions(decoder.width(), decoder.height())
        .with_codec(codec);

    log::debug!(
        "Probed {}: {:?}, {:.3} fps, {} frames",
        path.display(),
        metadata.duration,
        metadata.frames_per_second,
        metadata.frame_count
    );

    Ok((input_context, metadata, video_stream_index))
}

fn rgb_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, KeyscribeError> {
    let buffer = crate::conversion::frame_to_rgb_buffer(rgb_frame, width, height);
    let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        KeyscribeError::DecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(image))
}

//! Keyframe selection.
//!
//! [`select_keyframes`] scans a uniformly sampled subset of the video,
//! scores every adjacent pair of samples for visual change, keeps the
//! strongest well-separated peaks, backfills evenly spaced frames when the
//! video has too few cuts, and finally runs OCR on each chosen frame.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keyscribe::{KeyscribeError, MediaFile, SelectionOptions, TesseractRecognizer};
//!
//! let mut video = MediaFile::open("clip.mp4")?;
//! let result = keyscribe::select_keyframes(
//!     &mut video,
//!     Arc::new(TesseractRecognizer::new()),
//!     &SelectionOptions::default(),
//! )?;
//! for entry in result.entries() {
//!     println!("{:>8.3}s  {}", entry.timestamp.as_secs_f64(), entry.text);
//! }
//! # Ok::<(), KeyscribeError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::config::SelectionOptions;
use crate::error::KeyscribeError;
use crate::metadata::VideoMetadata;
use crate::ocr::TextRecognizer;
use crate::progress::{ProgressTracker, SelectionStage};
use crate::result::{EntryWarning, KeyframeEntry, KeyframeResult};
use crate::scoring::{FrameSignature, ShotScore};
use crate::selection::{self, SamplePoint, SelectionParams};
use crate::source::VideoSource;

/// Select representative keyframes from `video` and recognize their text.
///
/// The video is borrowed for the duration of the call only.
///
/// # Errors
///
/// - [`KeyscribeError::InvalidOptions`] if the options are inconsistent.
/// - [`KeyscribeError::InvalidInput`] if the video has no frames.
/// - [`KeyscribeError::DecodeError`] if no sampled frame could be decoded,
///   or a selected frame cannot be decoded again.
/// - [`KeyscribeError::Cancelled`] if the cancellation token fires.
///
/// OCR failures and timeouts do not fail the call; the affected entries get
/// empty text and a [`warning`](KeyframeEntry::warning).
pub fn select_keyframes(
    video: &mut dyn VideoSource,
    recognizer: Arc<dyn TextRecognizer>,
    options: &SelectionOptions,
) -> Result<KeyframeResult, KeyscribeError> {
    options.validate()?;
    let metadata = video.metadata().clone();
    check_video(&metadata)?;

    log::debug!(
        "Selecting {}-{} keyframes (duration={:?}, fps={:.3}, frames={})",
        options.min_count,
        options.max_count,
        metadata.duration,
        metadata.frames_per_second,
        metadata.frame_count
    );

    let scan = scan(video, &metadata, options)?;
    let separation = options
        .min_separation
        .unwrap_or_else(|| selection::default_separation(&scan.points, options.max_count));
    let picks = selection::choose(
        &scan.points,
        &scan.scores,
        &SelectionParams {
            min_count: options.min_count,
            max_count: options.max_count,
            min_separation: separation,
            change_threshold: options.change_threshold,
        },
    );

    log::debug!(
        "Picked {} keyframe(s) from {} sample(s), separation {:?}",
        picks.len(),
        scan.points.len(),
        separation
    );

    let mut frames = Vec::with_capacity(picks.len());
    for pick in &picks {
        let point = scan.points[pick.point];
        let image = video.decode_frame_at(point.timestamp).map_err(|error| match error {
            KeyscribeError::Cancelled => error,
            other => KeyscribeError::DecodeError(format!(
                "selected frame at {:?} could not be decoded: {other}",
                point.timestamp
            )),
        })?;
        frames.push((point.timestamp, image));
    }

    let outcomes = recognize_all(&frames, &recognizer, options)?;

    let entries = picks
        .iter()
        .zip(frames)
        .zip(outcomes)
        .map(|((pick, (timestamp, image)), outcome)| {
            let (text, lines, warning) = match outcome {
                Ok(raw) => {
                    let (text, lines) = clean_text(&raw, options);
                    (text, lines, None)
                }
                Err(KeyscribeError::Timeout(limit)) => {
                    log::warn!("OCR timed out at {timestamp:?} after {limit:?}");
                    (String::new(), Vec::new(), Some(EntryWarning::RecognitionTimedOut(limit)))
                }
                Err(error) => {
                    log::warn!("OCR failed at {timestamp:?}: {error}");
                    (
                        String::new(),
                        Vec::new(),
                        Some(EntryWarning::RecognitionFailed(error.to_string())),
                    )
                }
            };
            KeyframeEntry {
                timestamp,
                frame_number: scan.points[pick.point].frame_number,
                image,
                text,
                lines,
                origin: pick.origin,
                score: pick.score,
                warning,
            }
        })
        .collect();

    Ok(KeyframeResult::new(metadata.duration, entries))
}

/// Reusable selector bundling an OCR engine with options.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use keyscribe::{KeyframeSelector, MediaFile, SelectionOptions, TesseractRecognizer};
///
/// let selector = KeyframeSelector::new(Arc::new(TesseractRecognizer::new()))
///     .with_options(SelectionOptions::new().with_frame_budget(4, 6));
/// let mut video = MediaFile::open("clip.mp4")?;
/// let result = selector.select(&mut video)?;
/// println!("{}", result.to_json_pretty()?);
/// # Ok::<(), keyscribe::KeyscribeError>(())
/// ```
#[derive(Clone)]
pub struct KeyframeSelector {
    recognizer: Arc<dyn TextRecognizer>,
    options: SelectionOptions,
}

impl KeyframeSelector {
    /// Create a selector with default options.
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            options: SelectionOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: SelectionOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in use.
    pub fn options(&self) -> &SelectionOptions {
        &self.options
    }

    /// Run [`select_keyframes`] on `video`.
    pub fn select(&self, video: &mut dyn VideoSource) -> Result<KeyframeResult, KeyscribeError> {
        select_keyframes(video, Arc::clone(&self.recognizer), &self.options)
    }
}

/// Score every adjacent pair of sampled frames of `video`.
///
/// This is the scanning half of [`select_keyframes`], exposed for callers
/// that want to plot or threshold the change curve themselves.
pub fn shot_scores(
    video: &mut dyn VideoSource,
    options: &SelectionOptions,
) -> Result<Vec<ShotScore>, KeyscribeError> {
    options.validate()?;
    let metadata = video.metadata().clone();
    check_video(&metadata)?;
    let scan = scan(video, &metadata, options)?;
    Ok(scan
        .points
        .iter()
        .zip(scan.scores.iter())
        .filter_map(|(point, score)| {
            score.map(|score| ShotScore {
                timestamp: point.timestamp,
                frame_number: point.frame_number,
                score,
            })
        })
        .collect())
}

pub(crate) fn check_video(metadata: &VideoMetadata) -> Result<(), KeyscribeError> {
    if metadata.frame_count == 0 {
        return Err(KeyscribeError::InvalidInput(
            "video has no frames".to_string(),
        ));
    }
    if metadata.frames_per_second.is_nan() || metadata.frames_per_second <= 0.0 {
        return Err(KeyscribeError::InvalidInput(format!(
            "video frame rate must be positive, got {}",
            metadata.frames_per_second
        )));
    }
    Ok(())
}

struct Scan {
    points: Vec<SamplePoint>,
    /// `scores[i]` compares `points[i - 1]` and `points[i]`.
    scores: Vec<Option<f64>>,
}

fn scan(
    video: &mut dyn VideoSource,
    metadata: &VideoMetadata,
    options: &SelectionOptions,
) -> Result<Scan, KeyscribeError> {
    // Frame counts that overshoot the duration clamp several samples onto
    // the same timestamp; only the first of them is scanned.
    let mut samples: Vec<(u64, Duration)> =
        selection::sample_frame_numbers(metadata.frame_count, options.effective_max_samples())
            .into_iter()
            .map(|frame_number| (frame_number, metadata.timestamp_of(frame_number)))
            .collect();
    samples.dedup_by_key(|(_, timestamp)| *timestamp);

    let (analysis_width, analysis_height) = options.analysis_size;
    let mut tracker = ProgressTracker::new(
        Arc::clone(&options.progress),
        SelectionStage::Scanning,
        Some(samples.len() as u64),
    );

    if options.is_cancelled() {
        return Err(KeyscribeError::Cancelled);
    }

    let mut points = Vec::with_capacity(samples.len());
    let mut scores = Vec::with_capacity(samples.len());
    let mut previous: Option<FrameSignature> = None;
    let mut last_error: Option<KeyscribeError> = None;

    for &(frame_number, timestamp) in &samples {
        let started = Instant::now();
        match video.decode_frame_at(timestamp) {
            Ok(_) if options.decode_timeout.is_some_and(|limit| started.elapsed() > limit) => {
                let limit = options.decode_timeout.unwrap_or(Duration::ZERO);
                log::warn!("Decoding frame {frame_number} took longer than {limit:?}, skipping");
                last_error = Some(KeyscribeError::Timeout(limit));
            }
            Ok(image) => {
                let signature = FrameSignature::from_image(&image, analysis_width, analysis_height);
                let score = previous
                    .as_ref()
                    .map(|previous| previous.dissimilarity(&signature));
                points.push(SamplePoint {
                    frame_number,
                    timestamp,
                });
                scores.push(score);
                previous = Some(signature);
            }
            Err(KeyscribeError::Cancelled) => return Err(KeyscribeError::Cancelled),
            Err(error) => {
                log::warn!("Skipping frame {frame_number} at {timestamp:?}: {error}");
                last_error = Some(error);
            }
        }

        tracker.advance(Some(timestamp));
        if options.is_cancelled() {
            return Err(KeyscribeError::Cancelled);
        }
    }

    if points.is_empty() {
        let reason = last_error
            .map(|error| format!(": {error}"))
            .unwrap_or_default();
        return Err(KeyscribeError::DecodeError(format!(
            "none of the {} sampled frames could be decoded{reason}",
            samples.len()
        )));
    }

    Ok(Scan { points, scores })
}

/// Recognize every frame, keeping per-frame failures as values.
///
/// Only cancellation fails the whole batch.
fn recognize_all(
    frames: &[(Duration, DynamicImage)],
    recognizer: &Arc<dyn TextRecognizer>,
    options: &SelectionOptions,
) -> Result<Vec<Result<String, KeyscribeError>>, KeyscribeError> {
    #[cfg(feature = "rayon")]
    {
        crate::parallel::recognize_parallel(frames, recognizer, options)
    }

    #[cfg(not(feature = "rayon"))]
    {
        let mut tracker = ProgressTracker::new(
            Arc::clone(&options.progress),
            SelectionStage::Recognition,
            Some(frames.len() as u64),
        );
        let mut outcomes = Vec::with_capacity(frames.len());
        for (timestamp, image) in frames {
            if options.is_cancelled() {
                return Err(KeyscribeError::Cancelled);
            }
            outcomes.push(crate::ocr::recognize_with_timeout(
                recognizer,
                image.clone(),
                options.ocr_timeout,
            ));
            tracker.advance(Some(*timestamp));
            if options.is_cancelled() {
                return Err(KeyscribeError::Cancelled);
            }
        }
        Ok(outcomes)
    }
}

fn clean_text(raw: &str, options: &SelectionOptions) -> (String, Vec<String>) {
    match &options.text_cleanup {
        Some(cleanup) => {
            let lines = cleanup.clean(raw);
            (lines.join("\n"), lines)
        }
        None => {
            let text = raw.trim().to_string();
            let lines = text.lines().map(str::to_string).collect();
            (text, lines)
        }
    }
}

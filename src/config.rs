//! Selection configuration.
//!
//! [`SelectionOptions`] is a builder that threads the frame budget, the
//! heuristic's tuning knobs, collaborator timeouts, progress callbacks and
//! cancellation through [`select_keyframes`](crate::select_keyframes).
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use keyscribe::{CancellationToken, SelectionOptions};
//!
//! let token = CancellationToken::new();
//! let options = SelectionOptions::new()
//!     .with_frame_budget(3, 6)
//!     .with_min_separation(Duration::from_millis(800))
//!     .with_ocr_timeout(Duration::from_secs(5))
//!     .with_cancellation(token.clone());
//! assert!(options.validate().is_ok());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::error::KeyscribeError;
use crate::ocr::TextCleanup;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default lower bound on selected keyframes.
pub const DEFAULT_MIN_COUNT: usize = 3;
/// Default upper bound on selected keyframes.
pub const DEFAULT_MAX_COUNT: usize = 6;
/// Default cap on the number of frames decoded while scanning.
pub const DEFAULT_MAX_SAMPLES: usize = 48;
/// Default minimum score for a sample to count as a shot change.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.15;

/// Configuration for one keyframe selection.
///
/// A default-constructed value selects 3–6 frames, samples at most 48
/// frames, derives the minimum separation from the video length, applies no
/// timeouts and cleans OCR text.
#[derive(Clone)]
pub struct SelectionOptions {
    pub(crate) min_count: usize,
    pub(crate) max_count: usize,
    pub(crate) max_samples: usize,
    /// `None` derives the separation from the sampled span.
    pub(crate) min_separation: Option<Duration>,
    pub(crate) change_threshold: f64,
    /// Size of the luma signature used for scoring.
    pub(crate) analysis_size: (u32, u32),
    pub(crate) ocr_timeout: Option<Duration>,
    pub(crate) decode_timeout: Option<Duration>,
    /// `None` keeps the recognizer's raw (trimmed) text.
    pub(crate) text_cleanup: Option<TextCleanup>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for SelectionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SelectionOptions")
            .field("min_count", &self.min_count)
            .field("max_count", &self.max_count)
            .field("max_samples", &self.max_samples)
            .field("min_separation", &self.min_separation)
            .field("change_threshold", &self.change_threshold)
            .field("ocr_timeout", &self.ocr_timeout)
            .field("decode_timeout", &self.decode_timeout)
            .field("text_cleanup", &self.text_cleanup)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            min_count: DEFAULT_MIN_COUNT,
            max_count: DEFAULT_MAX_COUNT,
            max_samples: DEFAULT_MAX_SAMPLES,
            min_separation: None,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            analysis_size: (64, 36),
            ocr_timeout: None,
            decode_timeout: None,
            text_cleanup: Some(TextCleanup::default()),
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Set the lower and upper bound on selected keyframes.
    #[must_use]
    pub fn with_frame_budget(mut self, min_count: usize, max_count: usize) -> Self {
        self.min_count = min_count;
        self.max_count = max_count;
        self
    }

    /// Cap how many frames are decoded while scanning.
    ///
    /// The effective cap is never lower than the maximum keyframe count.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Fix the minimum distance between two selected keyframes.
    #[must_use]
    pub fn with_min_separation(mut self, separation: Duration) -> Self {
        self.min_separation = Some(separation);
        self
    }

    /// Minimum dissimilarity (0.0–1.0) for a peak to count as a shot change.
    #[must_use]
    pub fn with_change_threshold(mut self, threshold: f64) -> Self {
        self.change_threshold = threshold;
        self
    }

    /// Size of the grayscale signature frames are reduced to before scoring.
    #[must_use]
    pub fn with_analysis_size(mut self, width: u32, height: u32) -> Self {
        self.analysis_size = (width, height);
        self
    }

    /// Bound each OCR call. A timed-out frame keeps empty text and a warning.
    #[must_use]
    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = Some(timeout);
        self
    }

    /// Bound each decode call made while scanning.
    ///
    /// A sample whose decode overruns is discarded.
    #[must_use]
    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = Some(timeout);
        self
    }

    /// Set how recognized text is cleaned, or `None` to keep it raw.
    #[must_use]
    pub fn with_text_cleanup(mut self, cleanup: Option<TextCleanup>) -> Self {
        self.text_cleanup = cleanup;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// A cancelled selection returns [`KeyscribeError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Lower bound on selected keyframes.
    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Upper bound on selected keyframes.
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`KeyscribeError::InvalidOptions`] when the frame budget is
    /// not `1 ≤ min ≤ max`, the threshold is outside 0.0–1.0, or the
    /// analysis size or sample cap is zero.
    pub fn validate(&self) -> Result<(), KeyscribeError> {
        if self.min_count == 0 {
            return Err(KeyscribeError::InvalidOptions(
                "min_count must be at least 1".to_string(),
            ));
        }
        if self.min_count > self.max_count {
            return Err(KeyscribeError::InvalidOptions(format!(
                "min_count ({}) must not exceed max_count ({})",
                self.min_count, self.max_count
            )));
        }
        if self.max_samples == 0 {
            return Err(KeyscribeError::InvalidOptions(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.change_threshold) {
            return Err(KeyscribeError::InvalidOptions(format!(
                "change_threshold must be within 0.0..=1.0, got {}",
                self.change_threshold
            )));
        }
        if self.analysis_size.0 == 0 || self.analysis_size.1 == 0 {
            return Err(KeyscribeError::InvalidOptions(
                "analysis size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sample cap actually used: never fewer samples than keyframes.
    pub(crate) fn effective_max_samples(&self) -> usize {
        self.max_samples.max(self.max_count)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

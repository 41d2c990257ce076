//! End-to-end processing: download, probe, open, select.
//!
//! [`Pipeline`] wires the collaborators together so a URL or a local file
//! turns into a [`KeyframeResult`] in one call. Every collaborator is a
//! trait object and can be swapped independently.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use crate::error::KeyscribeError;
use crate::result::KeyframeResult;
use crate::selector::{KeyframeSelector, check_video};
use crate::source::{Downloader, Prober, SourceOpener};

/// Download → probe → open → select.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use keyscribe::{Pipeline, SelectionOptions, TesseractRecognizer, YtDlpDownloader};
///
/// let pipeline = Pipeline::ffmpeg(
///     Arc::new(YtDlpDownloader::new(std::env::temp_dir())),
///     Arc::new(TesseractRecognizer::new()),
/// )
/// .with_options(SelectionOptions::new().with_frame_budget(3, 5));
///
/// let result = pipeline.process_url("https://www.tiktok.com/@user/video/123")?;
/// println!("{}", result.to_json_pretty()?);
/// # Ok::<(), keyscribe::KeyscribeError>(())
/// ```
#[derive(Clone)]
pub struct Pipeline {
    downloader: Arc<dyn Downloader>,
    prober: Arc<dyn Prober>,
    opener: Arc<dyn SourceOpener>,
    selector: KeyframeSelector,
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Pipeline")
            .field("options", self.selector.options())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        downloader: Arc<dyn Downloader>,
        prober: Arc<dyn Prober>,
        opener: Arc<dyn SourceOpener>,
        selector: KeyframeSelector,
    ) -> Self {
        Self {
            downloader,
            prober,
            opener,
            selector,
        }
    }

    /// A pipeline probing and decoding with FFmpeg, with default options.
    #[cfg(feature = "ffmpeg")]
    pub fn ffmpeg(
        downloader: Arc<dyn Downloader>,
        recognizer: Arc<dyn crate::ocr::TextRecognizer>,
    ) -> Self {
        Self::new(
            downloader,
            Arc::new(crate::media_file::MediaProbe),
            Arc::new(crate::media_file::FfmpegOpener),
            KeyframeSelector::new(recognizer),
        )
    }

    /// Replace the selection options.
    #[must_use]
    pub fn with_options(mut self, options: crate::config::SelectionOptions) -> Self {
        self.selector = self.selector.with_options(options);
        self
    }

    /// The selector run on every opened video.
    pub fn selector(&self) -> &KeyframeSelector {
        &self.selector
    }

    /// Download `url`, then [`process_file`](Self::process_file) the result.
    ///
    /// # Errors
    ///
    /// Download errors are returned unchanged, followed by everything
    /// [`process_file`](Self::process_file) can return.
    pub fn process_url(&self, url: &str) -> Result<KeyframeResult, KeyscribeError> {
        let path = self.downloader.fetch(url)?;
        self.process_file(&path)
    }

    /// Probe, open and select keyframes from a local file.
    ///
    /// # Errors
    ///
    /// - [`KeyscribeError::UnreadableMedia`] when probing fails.
    /// - [`KeyscribeError::InvalidInput`] when the probed video has no
    ///   frames.
    /// - Anything [`select_keyframes`](crate::select_keyframes) returns.
    pub fn process_file(&self, path: &Path) -> Result<KeyframeResult, KeyscribeError> {
        let metadata = self.prober.probe(path)?;
        check_video(&metadata)?;
        log::debug!(
            "Processing {} ({:?}, {} frames)",
            path.display(),
            metadata.duration,
            metadata.frame_count
        );
        let mut video = self.opener.open(path, metadata)?;
        self.selector.select(video.as_mut())
    }
}

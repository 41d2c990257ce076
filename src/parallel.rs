//! Parallel OCR submission.
//!
//! With the `rayon` feature, keyframes are recognized concurrently on the
//! rayon pool. Each frame is independent; results come back in input order
//! (timestamp order) because the parallel iterator is indexed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ::rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use image::DynamicImage;

use crate::config::SelectionOptions;
use crate::error::KeyscribeError;
use crate::ocr::{TextRecognizer, recognize_with_timeout};
use crate::progress::{ProgressTracker, SelectionStage};

pub(crate) fn recognize_parallel(
    frames: &[(Duration, DynamicImage)],
    recognizer: &Arc<dyn TextRecognizer>,
    options: &SelectionOptions,
) -> Result<Vec<Result<String, KeyscribeError>>, KeyscribeError> {
    if options.is_cancelled() {
        return Err(KeyscribeError::Cancelled);
    }

    let tracker = Mutex::new(ProgressTracker::new(
        Arc::clone(&options.progress),
        SelectionStage::Recognition,
        Some(frames.len() as u64),
    ));

    let outcomes: Vec<Result<String, KeyscribeError>> = frames
        .par_iter()
        .with_max_len(1)
        .map(|(timestamp, image)| {
            if options.is_cancelled() {
                return Err(KeyscribeError::Cancelled);
            }
            let outcome = recognize_with_timeout(recognizer, image.clone(), options.ocr_timeout);
            if let Ok(mut tracker) = tracker.lock() {
                tracker.advance(Some(*timestamp));
            }
            outcome
        })
        .collect();

    if options.is_cancelled() {
        return Err(KeyscribeError::Cancelled);
    }
    Ok(outcomes)
}

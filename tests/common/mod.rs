//! Synthetic videos and scripted collaborators shared by the integration
//! tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use keyscribe::{
    FrameDecoder, FrameSequence, KeyscribeError, TextRecognizer, VideoMetadata, VideoSource,
};

pub const DARK: u8 = 20;
pub const BRIGHT: u8 = 230;

pub fn solid(value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 18, Rgb([value, value, value])))
}

/// `frame_count` frames at `frames_per_second`, switching between a dark
/// and a bright picture at every frame listed in `cuts`.
pub fn video_with_cuts(frame_count: u64, frames_per_second: f64, cuts: &[u64]) -> FrameSequence {
    let frames = (0..frame_count)
        .map(|frame_number| {
            let segment = cuts.iter().filter(|&&cut| cut <= frame_number).count();
            solid(if segment % 2 == 0 { DARK } else { BRIGHT })
        })
        .collect();
    FrameSequence::new(frames, frames_per_second).unwrap()
}

/// Frames whose brightness is the frame number, so any frame can be
/// identified from its pixels.
pub fn numbered_video(frame_count: u8, frames_per_second: f64) -> FrameSequence {
    FrameSequence::new((0..frame_count).map(solid).collect(), frames_per_second).unwrap()
}

pub fn brightness(frame: &DynamicImage) -> u8 {
    frame.get_pixel(0, 0).0[0]
}

/// Returns the same text for every frame.
pub struct FixedText(pub &'static str);

impl TextRecognizer for FixedText {
    fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
        Ok(self.0.to_string())
    }
}

/// Reports the brightness of the frame as its text.
pub struct BrightnessText;

impl TextRecognizer for BrightnessText {
    fn recognize_text(&self, frame: &DynamicImage) -> Result<String, KeyscribeError> {
        Ok(brightness(frame).to_string())
    }
}

/// Fails every call.
pub struct BrokenRecognizer;

impl TextRecognizer for BrokenRecognizer {
    fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
        Err(KeyscribeError::RecognitionError("engine crashed".to_string()))
    }
}

/// Answers `text` immediately except for the `slow_call`-th call (0-based),
/// which sleeps for `delay` first.
pub struct SlowOnCall {
    pub text: &'static str,
    pub slow_call: usize,
    pub delay: Duration,
    calls: AtomicUsize,
}

impl SlowOnCall {
    pub fn new(text: &'static str, slow_call: usize, delay: Duration) -> Self {
        Self {
            text,
            slow_call,
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

impl TextRecognizer for SlowOnCall {
    fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.slow_call {
            thread::sleep(self.delay);
        }
        Ok(self.text.to_string())
    }
}

/// Records every frame it is asked to read.
#[derive(Default)]
pub struct RecordingRecognizer {
    pub seen: Mutex<Vec<u8>>,
}

impl TextRecognizer for RecordingRecognizer {
    fn recognize_text(&self, frame: &DynamicImage) -> Result<String, KeyscribeError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(brightness(frame));
        }
        Ok(String::new())
    }
}

/// Wraps a source and misbehaves on demand.
pub struct FaultySource {
    inner: FrameSequence,
    /// Frame numbers that always fail to decode.
    pub broken_frames: Vec<u64>,
    /// Frame numbers whose decode takes `slow_delay`.
    pub slow_frames: Vec<u64>,
    pub slow_delay: Duration,
    /// Every decode after this many successful calls fails.
    pub fail_after: Option<usize>,
    pub decode_calls: usize,
}

impl FaultySource {
    pub fn new(inner: FrameSequence) -> Self {
        Self {
            inner,
            broken_frames: Vec::new(),
            slow_frames: Vec::new(),
            slow_delay: Duration::ZERO,
            fail_after: None,
            decode_calls: 0,
        }
    }
}

impl FrameDecoder for FaultySource {
    fn decode_frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, KeyscribeError> {
        let frame_number = self.inner.metadata().frame_number_at(timestamp);
        if self.fail_after.is_some_and(|limit| self.decode_calls >= limit) {
            return Err(KeyscribeError::DecodeError("decoder went away".to_string()));
        }
        if self.broken_frames.contains(&frame_number) {
            return Err(KeyscribeError::DecodeError(format!(
                "corrupt frame {frame_number}"
            )));
        }
        if self.slow_frames.contains(&frame_number) {
            thread::sleep(self.slow_delay);
        }
        self.decode_calls += 1;
        self.inner.decode_frame_at(timestamp)
    }
}

impl VideoSource for FaultySource {
    fn metadata(&self) -> &VideoMetadata {
        self.inner.metadata()
    }
}

pub fn seconds(timestamps: &[Duration]) -> Vec<f64> {
    timestamps.iter().map(Duration::as_secs_f64).collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

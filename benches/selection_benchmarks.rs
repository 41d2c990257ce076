//! Benchmarks for shot-change scoring and keyframe selection.
//!
//! Run with: cargo bench
//!
//! The FFmpeg benchmark needs `tests/fixtures/sample_video.mp4` and is
//! skipped without it.

use std::{path::Path, sync::Arc};

use criterion::Criterion;
use image::{DynamicImage, Rgb, RgbImage};
use keyscribe::{
    FrameSequence, FrameSignature, KeyscribeError, SelectionOptions, TextRecognizer,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

struct NoText;

impl TextRecognizer for NoText {
    fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
        Ok(String::new())
    }
}

fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

/// 300 frames at 30 fps with a hard cut every 2.5 seconds.
fn synthetic_video(width: u32, height: u32) -> FrameSequence {
    let frames = (0..300)
        .map(|index| solid(width, height, ((index / 75) * 60) as u8))
        .collect();
    FrameSequence::new(frames, 30.0).unwrap()
}

fn benchmark_signature(criterion: &mut Criterion) {
    let frame = solid(1280, 720, 128);
    let other = solid(1280, 720, 30);

    criterion.bench_function("signature from 720p frame", |bencher| {
        bencher.iter(|| FrameSignature::from_image(&frame, 64, 36));
    });

    let first = FrameSignature::from_image(&frame, 64, 36);
    let second = FrameSignature::from_image(&other, 64, 36);
    criterion.bench_function("signature dissimilarity", |bencher| {
        bencher.iter(|| first.dissimilarity(&second));
    });
}

fn benchmark_selection(criterion: &mut Criterion) {
    let recognizer: Arc<dyn TextRecognizer> = Arc::new(NoText);
    let options = SelectionOptions::default();

    criterion.bench_function("select keyframes (in-memory 300 frames)", |bencher| {
        let mut video = synthetic_video(320, 180);
        bencher.iter(|| {
            keyscribe::select_keyframes(&mut video, Arc::clone(&recognizer), &options).unwrap()
        });
    });
}

fn benchmark_ffmpeg_selection(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }
    keyscribe::set_ffmpeg_log_level(keyscribe::FfmpegLogLevel::Error);

    let recognizer: Arc<dyn TextRecognizer> = Arc::new(NoText);
    let options = SelectionOptions::default();

    criterion.bench_function("select keyframes (sample_video.mp4)", |bencher| {
        bencher.iter(|| {
            let mut video = keyscribe::MediaFile::open(SAMPLE_VIDEO).unwrap();
            keyscribe::select_keyframes(&mut video, Arc::clone(&recognizer), &options).unwrap()
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_signature,
    benchmark_selection,
    benchmark_ffmpeg_selection,
);
criterion::criterion_main!(benches);

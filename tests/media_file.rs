//! FFmpeg backend tests.
//!
//! Tests that need `tests/fixtures/sample_video.mp4` return early when it is
//! missing.

#![cfg(feature = "ffmpeg")]

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::FixedText;
use keyscribe::{
    FfmpegOpener, FrameDecoder, KeyscribeError, MediaFile, MediaProbe, Pipeline, Prober,
    SelectionOptions, SourceOpener, VideoSource, YtDlpDownloader,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[test]
fn missing_file_is_unreadable() {
    let result = MediaProbe.probe(Path::new("tests/fixtures/does_not_exist.mp4"));
    assert!(matches!(result, Err(KeyscribeError::UnreadableMedia { .. })));

    let result = MediaFile::open("tests/fixtures/does_not_exist.mp4");
    assert!(matches!(result, Err(KeyscribeError::UnreadableMedia { .. })));
}

#[test]
fn non_video_file_is_unreadable() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("notes.mp4");
    std::fs::write(&path, b"definitely not a video").unwrap();

    let result = MediaProbe.probe(&path);
    assert!(matches!(result, Err(KeyscribeError::UnreadableMedia { .. })));
}

#[test]
fn probe_reports_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let metadata = MediaProbe.probe(Path::new(path)).unwrap();
    assert!(metadata.duration > Duration::ZERO);
    assert!(metadata.frames_per_second > 0.0);
    assert!(metadata.frame_count > 0);
    assert!(metadata.width > 0 && metadata.height > 0);
}

#[test]
fn frames_decode_in_any_order() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = MediaFile::open(path).unwrap();
    let metadata = video.metadata().clone();
    let middle = metadata.duration / 2;

    let later = video.decode_frame_at(middle).unwrap();
    let first = video.decode_frame_at(Duration::ZERO).unwrap();
    assert_eq!((first.width(), first.height()), (metadata.width, metadata.height));
    assert_eq!((later.width(), later.height()), (metadata.width, metadata.height));

    let again = video.decode_frame_at(middle).unwrap();
    assert_eq!(later.to_rgb8().as_raw(), again.to_rgb8().as_raw());
}

#[test]
fn timestamp_past_the_end_is_rejected() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = MediaFile::open(path).unwrap();
    let beyond = video.metadata().duration + Duration::from_secs(60);
    let result = video.decode_frame_at(beyond);
    assert!(matches!(result, Err(KeyscribeError::InvalidTimestamp(_))));
}

#[test]
fn selects_keyframes_from_a_real_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut video = MediaFile::open(path).unwrap();
    let result = keyscribe::select_keyframes(
        &mut video,
        Arc::new(FixedText("text")),
        &SelectionOptions::default(),
    )
    .unwrap();

    assert!((3..=6).contains(&result.len()));
    assert!(result.timestamps().windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn opener_keeps_probed_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let metadata = MediaProbe.probe(Path::new(path)).unwrap();
    let video = FfmpegOpener.open(Path::new(path), metadata.clone()).unwrap();
    assert_eq!(video.metadata(), &metadata);
}

#[test]
fn ffmpeg_pipeline_processes_a_local_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let pipeline = Pipeline::ffmpeg(
        Arc::new(YtDlpDownloader::new(std::env::temp_dir())),
        Arc::new(FixedText("")),
    );
    let result = pipeline.process_file(Path::new(path)).unwrap();
    assert!(!result.is_empty());
}

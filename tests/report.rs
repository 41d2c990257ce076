//! JSON report shape and image export.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FixedText, SlowOnCall, video_with_cuts};
use keyscribe::{KeyframeResult, SelectionOptions};

fn select(
    recognizer: Arc<dyn keyscribe::TextRecognizer>,
    options: &SelectionOptions,
) -> KeyframeResult {
    let mut video = video_with_cuts(300, 30.0, &[150]);
    keyscribe::select_keyframes(&mut video, recognizer, options).unwrap()
}

#[test]
fn report_has_expected_fields() {
    let result = select(Arc::new(FixedText("SALE")), &SelectionOptions::default());
    let report = result.to_json_value().unwrap();

    assert_eq!(report["video_duration_seconds"].as_f64(), Some(10.0));
    assert_eq!(report["frame_count_selected"].as_u64(), Some(3));

    let frames = report["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 3);
    for frame in frames {
        assert_eq!(frame["text"], "SALE");
        assert!(frame["timestamp_seconds"].is_f64());
        assert!(frame.get("warning").is_none());
    }

    let timestamps: Vec<f64> = frames
        .iter()
        .filter_map(|frame| frame["timestamp_seconds"].as_f64())
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn warnings_appear_in_the_report() {
    let options = SelectionOptions::new().with_ocr_timeout(Duration::from_millis(100));
    let result = select(
        Arc::new(SlowOnCall::new("SALE", 0, Duration::from_secs(1))),
        &options,
    );
    let report = result.to_json_value().unwrap();
    let frames = report["frames"].as_array().unwrap();

    let warned: Vec<_> = frames
        .iter()
        .filter(|frame| frame.get("warning").is_some())
        .collect();
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0]["text"], "");
    assert!(
        warned[0]["warning"]
            .as_str()
            .is_some_and(|warning| warning.contains("timed out"))
    );
}

#[test]
fn compact_and_pretty_json_agree() {
    let result = select(Arc::new(FixedText("")), &SelectionOptions::default());
    let compact: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    let pretty: serde_json::Value =
        serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(compact, pretty);
    assert_eq!(compact, result.to_json_value().unwrap());
}

#[test]
fn images_are_saved_in_timestamp_order() {
    let result = select(Arc::new(FixedText("")), &SelectionOptions::default());
    let directory = tempfile::tempdir().unwrap();

    let paths = result.save_images(directory.path(), "png").unwrap();
    assert_eq!(paths.len(), 3);
    assert!(paths.iter().all(|path| path.exists()));

    let names: Vec<String> = paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names[0], "keyframe_00_00000000ms.png");
    assert!(names[1].starts_with("keyframe_01_"));

    let reloaded = image::open(&paths[1]).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (32, 18));
}

#[test]
fn jpeg_export_works() {
    let result = select(Arc::new(FixedText("")), &SelectionOptions::default());
    let directory = tempfile::tempdir().unwrap();
    let paths = result.save_images(directory.path().join("nested"), ".jpg").unwrap();
    assert_eq!(paths.len(), 3);
    assert!(paths.iter().all(|path| path.extension().is_some_and(|ext| ext == "jpg")));
}

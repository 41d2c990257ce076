//! OCR submission: timeouts, failures, text cleanup and output order.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    BrightnessText, BrokenRecognizer, FixedText, RecordingRecognizer, SlowOnCall, brightness,
    numbered_video, video_with_cuts,
};
use keyscribe::{EntryWarning, SelectionOptions, TextCleanup};

#[test]
fn timed_out_frame_keeps_its_slot() {
    let mut video = video_with_cuts(300, 30.0, &[150]);
    let recognizer = Arc::new(SlowOnCall::new("SALE", 1, Duration::from_secs(2)));
    let options = SelectionOptions::new().with_ocr_timeout(Duration::from_millis(200));

    let result = keyscribe::select_keyframes(&mut video, recognizer, &options).unwrap();

    assert_eq!(result.len(), 3);
    let warned: Vec<_> = result
        .entries()
        .iter()
        .filter(|entry| entry.has_warning())
        .collect();
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].text, "");
    assert!(warned[0].lines.is_empty());
    assert_eq!(
        warned[0].warning,
        Some(EntryWarning::RecognitionTimedOut(Duration::from_millis(200)))
    );
    assert!(
        result
            .entries()
            .iter()
            .filter(|entry| !entry.has_warning())
            .all(|entry| entry.text == "SALE")
    );
}

#[test]
fn recognizer_failures_become_warnings() {
    let mut video = video_with_cuts(90, 30.0, &[45]);
    let result = keyscribe::select_keyframes(
        &mut video,
        Arc::new(BrokenRecognizer),
        &SelectionOptions::default(),
    )
    .unwrap();

    assert_eq!(result.len(), 3);
    for entry in result.entries() {
        assert_eq!(entry.text, "");
        match &entry.warning {
            Some(EntryWarning::RecognitionFailed(reason)) => {
                assert!(reason.contains("engine crashed"));
            }
            other => panic!("expected a recognition failure, got {other:?}"),
        }
    }
}

#[test]
fn text_is_cleaned_by_default() {
    let mut video = video_with_cuts(90, 30.0, &[]);
    let raw = "  50% OFF  \n\n50% off\nTODAY ONLY\nxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\n";
    let result = keyscribe::select_keyframes(
        &mut video,
        Arc::new(FixedText(raw)),
        &SelectionOptions::default(),
    )
    .unwrap();

    for entry in result.entries() {
        assert_eq!(entry.text, "50% OFF\nTODAY ONLY");
        assert_eq!(entry.lines, vec!["50% OFF", "TODAY ONLY"]);
        assert!(!entry.has_warning());
    }
}

#[test]
fn cleanup_can_be_customised_or_disabled() {
    let raw = "one\ntwo\nthree\n";

    let mut video = video_with_cuts(90, 30.0, &[]);
    let options = SelectionOptions::new().with_text_cleanup(Some(TextCleanup {
        max_line_length: 60,
        max_lines: 1,
    }));
    let result =
        keyscribe::select_keyframes(&mut video, Arc::new(FixedText(raw)), &options).unwrap();
    assert!(result.entries().iter().all(|entry| entry.text == "one"));

    let mut video = video_with_cuts(90, 30.0, &[]);
    let options = SelectionOptions::new().with_text_cleanup(None);
    let result =
        keyscribe::select_keyframes(&mut video, Arc::new(FixedText(raw)), &options).unwrap();
    assert!(
        result
            .entries()
            .iter()
            .all(|entry| entry.text == "one\ntwo\nthree" && entry.lines.len() == 3)
    );
}

#[test]
fn each_entry_carries_the_text_of_its_own_frame() {
    let mut video = numbered_video(120, 30.0);
    let result = keyscribe::select_keyframes(
        &mut video,
        Arc::new(BrightnessText),
        &SelectionOptions::new().with_frame_budget(4, 6),
    )
    .unwrap();

    assert!(result.len() >= 4);
    for entry in result.entries() {
        assert_eq!(entry.text, brightness(&entry.image).to_string());
        assert_eq!(u64::from(brightness(&entry.image)), entry.frame_number);
    }
}

#[test]
fn every_pick_is_recognized_once() {
    let mut video = video_with_cuts(300, 30.0, &[150]);
    let recognizer = Arc::new(RecordingRecognizer::default());
    let result = keyscribe::select_keyframes(
        &mut video,
        Arc::clone(&recognizer) as Arc<dyn keyscribe::TextRecognizer>,
        &SelectionOptions::default(),
    )
    .unwrap();

    let seen = recognizer.seen.lock().unwrap();
    assert_eq!(seen.len(), result.len());
}

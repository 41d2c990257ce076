//! Select keyframes from a local file and print their text.
//!
//! Usage:
//!   cargo run --example select_keyframes -- <input_file> [min] [max]

use std::error::Error;
use std::sync::Arc;

use keyscribe::{KeyframeSelector, MediaFile, SelectionOptions, TesseractRecognizer};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let input_path = args.next().unwrap_or_else(|| "input.mp4".to_string());
    let min = args.next().map(|value| value.parse()).transpose()?.unwrap_or(3);
    let max = args.next().map(|value| value.parse()).transpose()?.unwrap_or(6);

    println!("Opening {input_path}...");
    let mut video = MediaFile::open(&input_path)?;

    let selector = KeyframeSelector::new(Arc::new(TesseractRecognizer::new()))
        .with_options(SelectionOptions::new().with_frame_budget(min, max));
    let result = selector.select(&mut video)?;

    println!(
        "Selected {} keyframe(s) from {:.2}s of video:",
        result.len(),
        result.video_duration().as_secs_f64()
    );
    for (i, entry) in result.entries().iter().enumerate() {
        println!(
            "  {:>2}. {:>7.3}s  {:?}  {}",
            i + 1,
            entry.timestamp.as_secs_f64(),
            entry.origin,
            entry.text.replace('\n', " | "),
        );
    }

    Ok(())
}

//! Print the shot-change curve of a video.
//!
//! Usage:
//!   cargo run --example shot_scores -- <input_file>

use std::error::Error;

use keyscribe::{MediaFile, SelectionOptions};

fn main() -> Result<(), Box<dyn Error>> {
    let input_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "input.mp4".to_string());

    let mut video = MediaFile::open(&input_path)?;
    let options = SelectionOptions::default();
    let scores = keyscribe::shot_scores(&mut video, &options)?;

    println!("{} sampled pair(s):", scores.len());
    for score in &scores {
        let bar = "#".repeat((score.score * 40.0).round() as usize);
        println!(
            "  frame {:>6}  {:>7.3}s  {:.3}  {bar}",
            score.frame_number,
            score.timestamp.as_secs_f64(),
            score.score,
        );
    }

    Ok(())
}

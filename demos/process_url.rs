//! Download a video with yt-dlp and print the JSON report.
//!
//! Usage:
//!   cargo run --features=rayon --example process_url -- <url>

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use keyscribe::{Pipeline, SelectionOptions, TesseractRecognizer, YtDlpDownloader};

fn main() -> Result<(), Box<dyn Error>> {
    let url = std::env::args()
        .nth(1)
        .ok_or("usage: process_url <url>")?;

    let pipeline = Pipeline::ffmpeg(
        Arc::new(YtDlpDownloader::new(std::env::temp_dir().join("keyscribe"))),
        Arc::new(TesseractRecognizer::new()),
    )
    .with_options(SelectionOptions::new().with_ocr_timeout(Duration::from_secs(10)));

    let result = pipeline.process_url(&url)?;
    println!("{}", result.to_json_pretty()?);
    Ok(())
}

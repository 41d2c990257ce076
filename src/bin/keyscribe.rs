use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use keyscribe::{
    Downloader, FfmpegLogLevel, KeyframeResult, MediaProbe, Pipeline, Prober, ProgressCallback,
    ProgressInfo, SelectionOptions, SelectionStage, TesseractRecognizer, YtDlpDownloader,
    download::is_http_url,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  keyscribe extract clip.mp4\n  keyscribe extract https://www.tiktok.com/@user/video/123 --json --progress\n  keyscribe extract clip.mp4 --min 4 --max 6 --out frames --ext jpg\n  keyscribe probe clip.mp4 --json\n  keyscribe completions zsh > _keyscribe";

#[derive(Debug, Parser)]
#[command(
    name = "keyscribe",
    version,
    about = "Pick representative keyframes from short videos and read their on-screen text",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while scanning and recognizing.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Parser)]
struct SourceOptions {
    /// Directory downloaded videos are stored in.
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Path to the yt-dlp executable.
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Select keyframes and recognize their text.
    #[command(
        about = "Select keyframes and read their text",
        after_help = "Examples:\n  keyscribe extract clip.mp4 --json\n  keyscribe extract clip.mp4 --separation 1.5 --threshold 0.2 --ocr-timeout 5"
    )]
    Extract {
        /// Input video path or http(s) URL.
        input: String,

        /// Minimum number of keyframes.
        #[arg(long, default_value_t = keyscribe::DEFAULT_MIN_COUNT)]
        min: usize,

        /// Maximum number of keyframes.
        #[arg(long, default_value_t = keyscribe::DEFAULT_MAX_COUNT)]
        max: usize,

        /// Maximum number of frames decoded while scanning.
        #[arg(long, default_value_t = keyscribe::DEFAULT_MAX_SAMPLES)]
        samples: usize,

        /// Minimum distance between keyframes (seconds or mm:ss).
        #[arg(long)]
        separation: Option<String>,

        /// Minimum change score (0.0-1.0) for a shot change.
        #[arg(long, default_value_t = keyscribe::DEFAULT_CHANGE_THRESHOLD)]
        threshold: f64,

        /// Per-frame OCR time limit in seconds.
        #[arg(long)]
        ocr_timeout: Option<String>,

        /// Per-frame decode time limit in seconds.
        #[arg(long)]
        decode_timeout: Option<String>,

        /// Path to the tesseract executable.
        #[arg(long, default_value = "tesseract")]
        tesseract: PathBuf,

        /// Tesseract language(s), e.g. eng or eng+fra.
        #[arg(long)]
        lang: Option<String>,

        /// Keep OCR text as returned instead of cleaning it.
        #[arg(long)]
        no_cleanup: bool,

        /// Save the selected frames into this directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Image extension for saved frames (png, jpg, bmp).
        #[arg(long, default_value = "png")]
        ext: String,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        source: SourceOptions,
    },

    /// Print video metadata.
    #[command(
        about = "Print video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  keyscribe probe clip.mp4\n  keyscribe probe clip.mp4 --json"
    )]
    Probe {
        /// Input video path or http(s) URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        source: SourceOptions,
    },

    /// Generate shell completions.
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Accepts plain seconds (`1.5`), `mm:ss` or `hh:mm:ss(.fff)`.
fn parse_seconds(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("time value must be a non-negative number: {trimmed}").into());
        }
        return Ok(Duration::try_from_secs_f64(seconds)?);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0_u64, minutes.parse::<u64>()?, seconds.parse::<f64>()?),
        [hours, minutes, seconds] => (
            hours.parse::<u64>()?,
            minutes.parse::<u64>()?,
            seconds.parse::<f64>()?,
        ),
        _ => return Err(format!("invalid time format: {trimmed}").into()),
    };
    let total = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    if !total.is_finite() || total < 0.0 {
        return Err(format!("time value must be a non-negative number: {trimmed}").into());
    }
    Ok(Duration::try_from_secs_f64(total)?)
}

fn parse_image_extension(value: &str) -> Option<&'static str> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "bmp" => Some("bmp"),
        "tif" | "tiff" => Some("tiff"),
        _ => None,
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        keyscribe::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn downloader(source: &SourceOptions) -> YtDlpDownloader {
    let directory = source
        .download_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("keyscribe"));
    YtDlpDownloader::new(directory).with_binary(&source.yt_dlp)
}

fn resolve_input(
    input: &str,
    source: &SourceOptions,
    verbose: bool,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if is_http_url(input) {
        let path = downloader(source).fetch(input)?;
        if verbose {
            eprintln!("downloaded {input} -> {}", path.display());
        }
        Ok(path)
    } else {
        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(format!("input not found: {input}").into());
        }
        Ok(path)
    }
}

fn ensure_writable_directory(
    directory: &Path,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !directory.exists() {
        return Ok(());
    }
    let has_keyframes = std::fs::read_dir(directory)?
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with("keyframe_"));
    if has_keyframes {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting keyframes in {}", directory.display()).yellow()
            );
        } else {
            return Err(format!(
                "{} already contains keyframes (use --overwrite to replace)",
                directory.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Drives one indicatif bar through both selection stages.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {msg:<10} {bar:40.cyan/blue} {pos}/{len}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let stage = match info.stage {
            SelectionStage::Scanning => "scanning",
            SelectionStage::Recognition => "ocr",
            _ => "working",
        };
        self.bar.set_message(stage);
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
    }
}

fn print_result(result: &KeyframeResult, verbose: bool) {
    println!(
        "{} {:.2}s, {} keyframe(s)",
        "video:".cyan().bold(),
        result.video_duration().as_secs_f64(),
        result.len()
    );
    for entry in result.entries() {
        let text = if entry.text.is_empty() {
            "(no text)".dimmed().to_string()
        } else {
            entry.text.replace('\n', " | ")
        };
        println!("  {:>8.3}s  {text}", entry.timestamp.as_secs_f64());
        if verbose {
            let score = entry
                .score
                .map(|score| format!("{score:.3}"))
                .unwrap_or_else(|| "-".to_string());
            eprintln!(
                "            frame {} origin {:?} score {score}",
                entry.frame_number, entry.origin
            );
        }
        if let Some(warning) = &entry.warning {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("{:.3}s: {warning}", entry.timestamp.as_secs_f64()).yellow()
            );
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Extract {
            input,
            min,
            max,
            samples,
            separation,
            threshold,
            ocr_timeout,
            decode_timeout,
            tesseract,
            lang,
            no_cleanup,
            out,
            ext,
            json,
            source,
        } => {
            let extension =
                parse_image_extension(&ext).ok_or(format!("unsupported --ext: {ext}"))?;
            if let Some(directory) = &out {
                ensure_writable_directory(directory, cli.global.overwrite)?;
            }

            let mut options = SelectionOptions::new()
                .with_frame_budget(min, max)
                .with_max_samples(samples)
                .with_change_threshold(threshold);
            if let Some(separation) = &separation {
                options = options.with_min_separation(parse_seconds(separation)?);
            }
            if let Some(timeout) = &ocr_timeout {
                options = options.with_ocr_timeout(parse_seconds(timeout)?);
            }
            if let Some(timeout) = &decode_timeout {
                options = options.with_decode_timeout(parse_seconds(timeout)?);
            }
            if no_cleanup {
                options = options.with_text_cleanup(None);
            }

            let progress = if cli.global.progress {
                let progress = Arc::new(BarProgress::new()?);
                options = options.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };
            options.validate()?;

            let mut recognizer = TesseractRecognizer::new().with_binary(tesseract);
            if let Some(lang) = lang {
                recognizer = recognizer.with_language(lang);
            }

            let pipeline = Pipeline::ffmpeg(Arc::new(downloader(&source)), Arc::new(recognizer))
                .with_options(options);
            let path = resolve_input(&input, &source, cli.global.verbose)?;
            let result = pipeline.process_file(&path);

            if let Some(progress) = progress {
                progress.bar.finish_and_clear();
            }
            let result = result?;

            if json {
                println!("{}", result.to_json_pretty()?);
            } else {
                print_result(&result, cli.global.verbose);
            }

            if let Some(directory) = out {
                let paths = result.save_images(&directory, extension)?;
                if cli.global.verbose {
                    for path in &paths {
                        eprintln!("saved {}", path.display());
                    }
                }
                eprintln!(
                    "{} {}",
                    "success:".green().bold(),
                    format!("Saved {} keyframe(s) to {}", paths.len(), directory.display())
                        .green()
                );
            }
        }
        Commands::Probe {
            input,
            json,
            source,
        } => {
            let path = resolve_input(&input, &source, cli.global.verbose)?;
            let metadata = MediaProbe.probe(&path)?;
            if json {
                let payload = json!({
                    "path": path.display().to_string(),
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "frames_per_second": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "width": metadata.width,
                    "height": metadata.height,
                    "codec": metadata.codec,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "file:".cyan().bold(), path.display());
                println!("Duration: {:.3}s", metadata.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.3} fps, {} frames ({})",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "keyscribe", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_image_extension, parse_seconds};
    use clap::CommandFactory;

    #[test]
    fn parse_seconds_formats() {
        assert_eq!(parse_seconds("1.5").unwrap().as_millis(), 1500);
        assert_eq!(parse_seconds("01:15").unwrap().as_secs(), 75);
        assert_eq!(parse_seconds("00:01:15.5").unwrap().as_millis(), 75_500);
        assert!(parse_seconds("").is_err());
        assert!(parse_seconds("-2").is_err());
        assert!(parse_seconds("1:2:3:4").is_err());
    }

    #[test]
    fn parse_seconds_rejects_out_of_range_values() {
        assert!(parse_seconds("1e300").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("0:inf").is_err());
        assert!(parse_seconds("00:00:-1").is_err());
    }

    #[test]
    fn parse_image_extension_aliases() {
        assert_eq!(parse_image_extension("PNG"), Some("png"));
        assert_eq!(parse_image_extension(".jpeg"), Some("jpg"));
        assert_eq!(parse_image_extension("tif"), Some("tiff"));
        assert_eq!(parse_image_extension("gif"), None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}

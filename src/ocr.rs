//! Text recognition on keyframes.
//!
//! [`TextRecognizer`] is the OCR collaborator. [`TesseractRecognizer`]
//! drives the `tesseract` command-line tool; any other engine can be plugged
//! in by implementing the trait.
//!
//! Recognized text is post-processed by [`TextCleanup`] before it lands in
//! a [`KeyframeEntry`](crate::KeyframeEntry): captions on social video tend
//! to come back with noise lines, repeated lines and stray long garbage.

use std::io::{Cursor, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::{DynamicImage, ImageFormat};

use crate::error::KeyscribeError;

/// Recognizes text in a single image.
///
/// Implementations must be [`Send`] and [`Sync`]: calls may run on helper
/// threads (timeouts) or rayon workers (feature `rayon`).
pub trait TextRecognizer: Send + Sync {
    /// Return the text found in `frame`, possibly empty.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::RecognitionError`] when the engine fails.
    fn recognize_text(&self, frame: &DynamicImage) -> Result<String, KeyscribeError>;

    /// Like [`recognize_text`](Self::recognize_text), but give up once
    /// `deadline` passes.
    ///
    /// The default ignores the deadline. Engines that hold external
    /// resources, such as a child process, override it to release them on
    /// time.
    ///
    /// # Errors
    ///
    /// [`KeyscribeError::Timeout`] when the deadline passes first.
    fn recognize_text_until(
        &self,
        frame: &DynamicImage,
        deadline: Instant,
    ) -> Result<String, KeyscribeError> {
        let _ = deadline;
        self.recognize_text(frame)
    }
}

/// Poll interval while waiting on a `tesseract` process with a deadline.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Rules applied to recognized text.
///
/// Lines are trimmed; empty lines and lines longer than
/// `max_line_length` characters are dropped; repeated lines are removed
/// case-insensitively (first spelling wins); at most `max_lines` are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCleanup {
    /// Longest line kept, in characters.
    pub max_line_length: usize,
    /// Maximum number of lines kept.
    pub max_lines: usize,
}

impl Default for TextCleanup {
    fn default() -> Self {
        Self {
            max_line_length: 60,
            max_lines: 4,
        }
    }
}

impl TextCleanup {
    /// Split `raw` into cleaned lines.
    ///
    /// # Example
    ///
    /// ```
    /// use keyscribe::TextCleanup;
    ///
    /// let lines = TextCleanup::default().clean("  SALE \n\nsale\n50% OFF\n");
    /// assert_eq!(lines, vec!["SALE", "50% OFF"]);
    /// ```
    pub fn clean(&self, raw: &str) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut lines = Vec::new();
        for line in raw.lines().map(str::trim) {
            if lines.len() >= self.max_lines {
                break;
            }
            if line.is_empty() || line.chars().count() > self.max_line_length {
                continue;
            }
            let folded = line.to_lowercase();
            if seen.contains(&folded) {
                continue;
            }
            seen.push(folded);
            lines.push(line.to_string());
        }
        lines
    }
}

/// OCR through the `tesseract` command-line tool.
///
/// The frame is converted to grayscale, encoded as PNG and piped to
/// `tesseract stdin stdout`.
///
/// # Example
///
/// ```no_run
/// use keyscribe::{TesseractRecognizer, TextRecognizer};
///
/// let recognizer = TesseractRecognizer::new().with_language("eng");
/// let frame = image::open("frame.png")?;
/// println!("{}", recognizer.recognize_text(&frame)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: Option<String>,
    page_segmentation_mode: Option<u8>,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractRecognizer {
    /// Use `tesseract` from `PATH` with its default language.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: None,
            page_segmentation_mode: None,
        }
    }

    /// Use a specific `tesseract` executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Language pack(s), e.g. `"eng"` or `"eng+fra"`.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Tesseract page segmentation mode (`--psm`).
    pub fn with_page_segmentation_mode(mut self, mode: u8) -> Self {
        self.page_segmentation_mode = Some(mode);
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg("stdin").arg("stdout");
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }
        if let Some(mode) = self.page_segmentation_mode {
            command.arg("--psm").arg(mode.to_string());
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl TesseractRecognizer {
    fn run(
        &self,
        frame: &DynamicImage,
        deadline: Option<Instant>,
    ) -> Result<String, KeyscribeError> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(frame.to_luma8())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let started = Instant::now();
        let mut child = self.command().spawn().map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                KeyscribeError::RecognitionError(format!(
                    "{} not found; install tesseract or pass its path",
                    self.binary.display()
                ))
            } else {
                KeyscribeError::RecognitionError(error.to_string())
            }
        })?;

        // Pipes are drained on their own threads so a full pipe never
        // stalls the deadline check.
        let stdin = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                let _ = stdin.write_all(&png);
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match deadline {
            Some(deadline) => wait_until(&mut child, deadline).map_err(|error| match error {
                KeyscribeError::Timeout(_) => {
                    KeyscribeError::Timeout(deadline.saturating_duration_since(started))
                }
                other => other,
            })?,
            None => child.wait()?,
        };
        if let Some(writer) = stdin {
            let _ = writer.join();
        }
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            return Err(KeyscribeError::RecognitionError(format!(
                "tesseract exited with {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize_text(&self, frame: &DynamicImage) -> Result<String, KeyscribeError> {
        self.run(frame, None)
    }

    fn recognize_text_until(
        &self,
        frame: &DynamicImage,
        deadline: Instant,
    ) -> Result<String, KeyscribeError> {
        self.run(frame, Some(deadline))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Wait for `child`, killing it once `deadline` passes.
fn wait_until(
    child: &mut Child,
    deadline: Instant,
) -> Result<std::process::ExitStatus, KeyscribeError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            log::debug!("Killing tesseract process {} after its deadline", child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(KeyscribeError::Timeout(Duration::ZERO));
        }
        thread::sleep(CHILD_POLL_INTERVAL.min(deadline - now));
    }
}

/// Run one recognition, bounded by `timeout` when set.
///
/// A bounded call runs on a helper thread that is handed the deadline. On
/// timeout the caller moves on; the helper finishes on its own and its
/// result is dropped.
pub(crate) fn recognize_with_timeout(
    recognizer: &Arc<dyn TextRecognizer>,
    frame: DynamicImage,
    timeout: Option<Duration>,
) -> Result<String, KeyscribeError> {
    let Some(timeout) = timeout else {
        return recognizer.recognize_text(&frame);
    };

    let deadline = Instant::now().checked_add(timeout);
    let (sender, receiver) = mpsc::channel();
    let recognizer = Arc::clone(recognizer);
    thread::Builder::new()
        .name("keyscribe-ocr".to_string())
        .spawn(move || {
            let result = match deadline {
                Some(deadline) => recognizer.recognize_text_until(&frame, deadline),
                None => recognizer.recognize_text(&frame),
            };
            let _ = sender.send(result);
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(Err(KeyscribeError::Timeout(_))) => Err(KeyscribeError::Timeout(timeout)),
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(KeyscribeError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(KeyscribeError::RecognitionError(
            "recognizer thread panicked".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy(Duration);

    impl TextRecognizer for Sleepy {
        fn recognize_text(&self, _frame: &DynamicImage) -> Result<String, KeyscribeError> {
            thread::sleep(self.0);
            Ok("late".to_string())
        }
    }

    #[test]
    fn cleanup_drops_long_and_duplicate_lines() {
        let cleanup = TextCleanup::default();
        let long = "x".repeat(61);
        let raw = format!("Hello\n{long}\nHELLO\n  world  \n");
        assert_eq!(cleanup.clean(&raw), vec!["Hello", "world"]);
    }

    #[test]
    fn cleanup_keeps_at_most_max_lines() {
        let cleanup = TextCleanup {
            max_line_length: 60,
            max_lines: 2,
        };
        assert_eq!(cleanup.clean("a\nb\nc\nd"), vec!["a", "b"]);
    }

    #[test]
    fn timeout_is_reported() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(Sleepy(Duration::from_millis(500)));
        let result = recognize_with_timeout(
            &recognizer,
            DynamicImage::new_rgb8(4, 4),
            Some(Duration::from_millis(20)),
        );
        assert!(matches!(result, Err(KeyscribeError::Timeout(_))));
    }

    #[test]
    fn fast_recognizer_beats_timeout() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(Sleepy(Duration::ZERO));
        let result = recognize_with_timeout(
            &recognizer,
            DynamicImage::new_rgb8(4, 4),
            Some(Duration::from_secs(5)),
        );
        assert_eq!(result.unwrap(), "late");
    }

    #[test]
    fn deadline_is_ignored_by_default() {
        let recognizer = Sleepy(Duration::ZERO);
        let result = recognizer.recognize_text_until(&DynamicImage::new_rgb8(4, 4), Instant::now());
        assert_eq!(result.unwrap(), "late");
    }

    #[cfg(unix)]
    #[test]
    fn slow_tesseract_is_killed_at_deadline() {
        use std::os::unix::fs::PermissionsExt;

        let directory = tempfile::tempdir().unwrap();
        let script = directory.path().join("tesseract");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let recognizer = TesseractRecognizer::new().with_binary(&script);
        let started = Instant::now();
        let result = recognizer.recognize_text_until(
            &DynamicImage::new_rgb8(4, 4),
            started + Duration::from_millis(100),
        );

        assert!(matches!(result, Err(KeyscribeError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_tesseract_binary_is_a_recognition_error() {
        let recognizer = TesseractRecognizer::new().with_binary("/nonexistent/tesseract-binary");
        let result = recognizer.recognize_text(&DynamicImage::new_rgb8(4, 4));
        assert!(matches!(result, Err(KeyscribeError::RecognitionError(_))));
    }
}

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::subtitles::SUBTITLE_EXT;
use crate::video::VideoId;
use crate::SummarizerError;

/// Exit status and merged stdout/stderr of one subprocess run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub combined_output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the subtitle extraction tool
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run with the given arguments, killing the process if `cancel` fires
    async fn run(&self, args: &[String], cancel: &CancellationToken) -> Result<CommandOutput, SummarizerError>;
}

/// yt-dlp executable on disk or in `PATH`
pub struct YtDlpRunner {
    yt_dlp_path: PathBuf,
}

impl YtDlpRunner {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.yt_dlp_path
    }
}

impl Default for YtDlpRunner {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl CommandRunner for YtDlpRunner {
    async fn run(&self, args: &[String], cancel: &CancellationToken) -> Result<CommandOutput, SummarizerError> {
        tracing::debug!("Running {} {}", self.yt_dlp_path.display(), args.join(" "));

        let child = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SummarizerError::ExtractionFailed {
                code: None,
                output: format!("failed to start {}: {}", self.yt_dlp_path.display(), e),
            })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|e| SummarizerError::ExtractionFailed {
                code: None,
                output: format!("failed to wait for yt-dlp: {}", e),
            })?,
            _ = cancel.cancelled() => return Err(SummarizerError::Cancelled),
        };

        let mut combined_output = String::from_utf8_lossy(&output.stdout).into_owned();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            exit_code: output.status.code(),
            combined_output,
        })
    }
}

/// Arguments for a subtitles-only download of one language
pub fn subtitle_args(video_id: &VideoId, lang: &str, output_template: &str) -> Vec<String> {
    [
        "--skip-download",
        "--write-sub",
        "--write-auto-sub",
        "--sub-format",
        SUBTITLE_EXT,
        "--sub-langs",
        lang,
        "--output",
        output_template,
        "--ignore-config",
        "--no-playlist",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(video_id.watch_url()))
    .collect()
}

/// Map a finished run onto the error taxonomy.
///
/// Only failed runs are inspected; a zero exit is success even if the output
/// mentions missing subtitles, the caller then finds no artifact.
pub fn classify(output: &CommandOutput) -> Result<(), SummarizerError> {
    if output.success() {
        return Ok(());
    }

    let trimmed = output.combined_output.trim();
    let lower = trimmed.to_lowercase();

    if lower.contains("no subtitles") || lower.contains("subtitles for language") {
        Err(SummarizerError::NoSubtitles)
    } else if lower.contains("too many requests") || lower.contains("http error 429") {
        Err(SummarizerError::RateLimited(trimmed.to_string()))
    } else {
        Err(SummarizerError::ExtractionFailed {
            code: output.exit_code,
            output: trimmed.to_string(),
        })
    }
}

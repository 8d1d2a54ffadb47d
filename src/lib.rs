//! Video Summarizer - a chat bot that turns YouTube links into short summaries
//!
//! Inbound links are admitted into a bounded queue and processed one at a time by a
//! single worker. For each job the subtitles are pulled with yt-dlp (with language
//! fallback and rate-limit backoff), flattened into a transcript and handed to an LLM.

pub mod chat;
pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod subtitles;
pub mod summarize;
pub mod transcript;
pub mod utils;
pub mod video;
pub mod ytdlp;

pub use chat::{ChatId, ChatTransport};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use pipeline::SummarizeVideo;
pub use queue::{Admission, Job, JobQueue, Worker};
pub use subtitles::SubtitleStore;
pub use summarize::Summarizer;
pub use transcript::{TranscriptAcquirer, TranscriptProvider};
pub use video::VideoId;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the summarizer
#[derive(thiserror::Error, Debug)]
pub enum SummarizerError {
    #[error("invalid video url: {0}")]
    InvalidInput(String),

    #[error("unsupported video host: {0}")]
    UnsupportedHost(String),

    #[error("no subtitles downloaded")]
    NoSubtitles,

    #[error("rate limited by youtube: {0}")]
    RateLimited(String),

    #[error("empty transcript returned")]
    EmptyTranscript,

    #[error("yt-dlp failed (exit code {code:?}): {output}")]
    ExtractionFailed { code: Option<i32>, output: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("job timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("job queue is full")]
    QueueFull,

    #[error("summarizer failed: {0}")]
    SummarizerFailed(String),

    #[error("subtitle storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl SummarizerError {
    /// Transient failures are retried or skipped inside transcript acquisition
    pub fn is_transient(&self) -> bool {
        matches!(self, SummarizerError::NoSubtitles | SummarizerError::RateLimited(_))
    }
}

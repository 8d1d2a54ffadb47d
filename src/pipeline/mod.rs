use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::subtitles::SubtitleStore;
use crate::summarize::{build_prompt, Summarizer};
use crate::transcript::TranscriptProvider;
use crate::video::{self, VideoId};
use crate::{Result, SummarizerError};

/// Removes the subtitle artifacts of a video when dropped.
///
/// Dropping also happens when the owning future is cancelled or times out, so
/// partial downloads never outlive the job that produced them.
pub struct CleanupGuard {
    store: Arc<dyn SubtitleStore>,
    video_id: VideoId,
}

impl CleanupGuard {
    pub fn new(store: Arc<dyn SubtitleStore>, video_id: VideoId) -> Self {
        Self { store, video_id }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let removed = self.store.clean_up(&self.video_id);
        tracing::debug!(video_id = %self.video_id, removed, "subtitle cleanup finished");
    }
}

/// Link in, summary out
pub struct SummarizeVideo {
    transcripts: Arc<dyn TranscriptProvider>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn SubtitleStore>,
    summary_language: String,
}

impl SummarizeVideo {
    pub fn new(
        transcripts: Arc<dyn TranscriptProvider>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn SubtitleStore>,
        summary_language: impl Into<String>,
    ) -> Self {
        Self {
            transcripts,
            summarizer,
            store,
            summary_language: summary_language.into(),
        }
    }

    /// Resolve the link, fetch its transcript and summarize it.
    ///
    /// Subtitle artifacts of the video are removed on every exit path.
    pub async fn execute(&self, raw_url: &str, cancel: &CancellationToken) -> Result<String> {
        let video_id = self.resolve(raw_url)?;
        let _cleanup = CleanupGuard::new(self.store.clone(), video_id.clone());

        let transcript = self.transcript_for(&video_id, cancel).await?;

        let prompt = build_prompt(&transcript, &self.summary_language);
        info!(video_id = %video_id, length = transcript.len(), "sending transcript to summarizer");

        let summary = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SummarizerError::Cancelled),
            summary = self.summarizer.summarize(&prompt) => summary,
        };
        let summary = summary
            .map_err(|e| {
                error!(video_id = %video_id, error = %e, "failed to summarize video");
                e
            })
            .context("summarize video")?;

        info!(video_id = %video_id, "summary generated");
        Ok(summary)
    }

    /// Resolve the link and fetch its transcript without summarizing
    pub async fn transcript(&self, raw_url: &str, cancel: &CancellationToken) -> Result<String> {
        let video_id = self.resolve(raw_url)?;
        let _cleanup = CleanupGuard::new(self.store.clone(), video_id.clone());
        self.transcript_for(&video_id, cancel).await
    }

    fn resolve(&self, raw_url: &str) -> Result<VideoId> {
        video::resolve(raw_url).map_err(|e| {
            error!(error = %e, "failed to parse video url");
            e.into()
        })
    }

    async fn transcript_for(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<String> {
        info!(video_id = %video_id, "fetching transcript");
        self.transcripts
            .fetch_transcript(video_id, cancel)
            .await
            .map_err(|e| {
                error!(video_id = %video_id, error = %e, "failed to fetch transcript");
                e
            })
            .context("fetch transcript")
    }
}

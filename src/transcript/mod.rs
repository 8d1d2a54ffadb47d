use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::subtitles::SubtitleStore;
use crate::video::VideoId;
use crate::ytdlp::{classify, subtitle_args, CommandRunner};
use crate::SummarizerError;

pub mod retry;

pub use retry::RetryState;

/// Source of plain-text transcripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the transcript of a video
    async fn fetch_transcript(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<String, SummarizerError>;
}

/// Language tags tried together, e.g. a language and its regional variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageGroup {
    pub tags: Vec<String>,
}

impl LanguageGroup {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Base language of the group (`ru` for `["ru", "ru.*"]`)
    pub fn base_language(&self) -> Option<&str> {
        self.tags
            .first()
            .map(|tag| tag.trim_end_matches(".*"))
            .filter(|tag| !tag.is_empty())
    }
}

/// Language fallback chain and retry limits
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Groups in the order they are tried
    pub groups: Vec<LanguageGroup>,

    /// Subprocess runs per language tag
    pub max_attempts: u32,

    /// First rate-limit backoff, doubled on every retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            groups: vec![
                LanguageGroup::new(["ru", "ru.*"]),
                LanguageGroup::new(["en", "en.*"]),
            ],
            max_attempts: 3,
            initial_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Base languages in group order, used to rank cached artifacts
    pub fn preferred_languages(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter_map(LanguageGroup::base_language)
            .map(str::to_string)
            .collect()
    }
}

/// Downloads subtitles with yt-dlp, falling back across languages and backing off
/// when YouTube rate-limits us
pub struct TranscriptAcquirer {
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn SubtitleStore>,
    policy: RetryPolicy,
}

impl TranscriptAcquirer {
    pub fn new(runner: Arc<dyn CommandRunner>, store: Arc<dyn SubtitleStore>, policy: RetryPolicy) -> Self {
        Self { runner, store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Walk the language groups in order until one yields a transcript.
    ///
    /// Missing subtitles move on to the next tag, rate limiting is retried with
    /// exponential backoff, anything else aborts the whole fetch.
    pub async fn fetch(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<String, SummarizerError> {
        let mut state = RetryState::new(self.policy.initial_backoff);

        for (group_index, group) in self.policy.groups.iter().enumerate() {
            for (tag_index, lang) in group.tags.iter().enumerate() {
                state.start_tag(group_index, tag_index);

                if let Some(transcript) = self.store.find_existing(video_id) {
                    info!(video_id = %video_id, "reusing previously downloaded subtitles");
                    return Ok(transcript);
                }

                loop {
                    if cancel.is_cancelled() {
                        return Err(SummarizerError::Cancelled);
                    }

                    let attempt = state.start_attempt();
                    debug!(video_id = %video_id, lang = %lang, attempt, "downloading subtitles");

                    match self.download(video_id, lang, cancel).await {
                        Ok(transcript) => {
                            info!(video_id = %video_id, lang = %lang, attempt, "subtitles downloaded");
                            return Ok(transcript);
                        }
                        Err(SummarizerError::NoSubtitles) => {
                            debug!(video_id = %video_id, lang = %lang, "no subtitles for language");
                            state.record(SummarizerError::NoSubtitles);
                            break;
                        }
                        Err(err @ SummarizerError::RateLimited(_)) => {
                            state.record(err);
                            let Some(delay) = state.next_backoff(self.policy.max_attempts) else {
                                warn!(video_id = %video_id, lang = %lang, "rate limited, attempts exhausted");
                                break;
                            };
                            warn!(video_id = %video_id, lang = %lang, attempt, ?delay, "rate limited, backing off");
                            wait(delay, cancel).await?;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        Err(state.into_error())
    }

    async fn download(&self, video_id: &VideoId, lang: &str, cancel: &CancellationToken) -> Result<String, SummarizerError> {
        let args = subtitle_args(video_id, lang, &self.store.output_template());
        let output = self.runner.run(&args, cancel).await?;
        classify(&output)?;
        self.store.load(video_id)
    }
}

#[async_trait]
impl TranscriptProvider for TranscriptAcquirer {
    async fn fetch_transcript(&self, video_id: &VideoId, cancel: &CancellationToken) -> Result<String, SummarizerError> {
        self.fetch(video_id, cancel).await
    }
}

/// Sleep unless cancelled first
async fn wait(delay: Duration, cancel: &CancellationToken) -> Result<(), SummarizerError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SummarizerError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

use std::time::Duration;

use crate::SummarizerError;

/// Progress of one transcript acquisition.
///
/// Tracks where in the language fallback chain the fetch is, how many attempts the
/// current tag has used and how long the next rate-limit backoff will be. The backoff
/// keeps doubling for the whole fetch, so every wait is longer than the one before.
#[derive(Debug)]
pub struct RetryState {
    group: usize,
    tag: usize,
    attempt: u32,
    backoff: Duration,
    last_error: Option<SummarizerError>,
}

impl RetryState {
    pub fn new(initial_backoff: Duration) -> Self {
        Self {
            group: 0,
            tag: 0,
            attempt: 0,
            backoff: initial_backoff,
            last_error: None,
        }
    }

    /// Move to a language tag, resetting its attempt counter
    pub fn start_tag(&mut self, group: usize, tag: usize) {
        self.group = group;
        self.tag = tag;
        self.attempt = 0;
    }

    /// Count a new attempt for the current tag and return its number (1-based)
    pub fn start_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Remember a non-fatal failure for the final report
    pub fn record(&mut self, error: SummarizerError) {
        self.last_error = Some(error);
    }

    /// Delay before retrying the current tag, or `None` once its attempts are spent
    pub fn next_backoff(&mut self, max_attempts: u32) -> Option<Duration> {
        if self.attempt >= max_attempts {
            return None;
        }
        let delay = self.backoff;
        self.backoff = self.backoff.saturating_mul(2);
        Some(delay)
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Error reported when every tag of every group was exhausted
    pub fn into_error(self) -> SummarizerError {
        self.last_error.unwrap_or(SummarizerError::NoSubtitles)
    }
}

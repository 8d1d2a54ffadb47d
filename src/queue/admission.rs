use std::sync::Arc;
use tracing::{info, warn};

use super::{Job, JobQueue, JobState};
use crate::chat::{notices, ChatId, ChatTransport};
use crate::video::looks_like_video_link;
use crate::SummarizerError;

/// What happened to an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Blank message, nothing to do
    Ignored,
    NotALink,
    Queued { position: usize },
    QueueFull,
    /// The worker is gone, nothing can be queued any more
    Closed,
}

/// Front door of the job queue
#[derive(Clone)]
pub struct Admission {
    queue: JobQueue,
    transport: Arc<dyn ChatTransport>,
}

impl Admission {
    pub fn new(queue: JobQueue, transport: Arc<dyn ChatTransport>) -> Self {
        Self { queue, transport }
    }

    /// Enqueue `text` for `chat_id` if it looks like a video link, replying either way
    pub async fn admit(&self, chat_id: ChatId, text: &str) -> AdmissionOutcome {
        let text = text.trim();
        if text.is_empty() {
            return AdmissionOutcome::Ignored;
        }

        if !looks_like_video_link(text) {
            self.reply(chat_id, notices::GUIDANCE).await;
            return AdmissionOutcome::NotALink;
        }

        let job = Job::new(chat_id, text);
        let job_id = job.id;
        info!(%job_id, chat_id, state = %JobState::Submitted, "job submitted");

        match self.queue.try_enqueue(job) {
            Ok(position) => {
                info!(%job_id, chat_id, position, state = %JobState::Queued, "job queued");
                self.reply(chat_id, &notices::queued(position)).await;
                AdmissionOutcome::Queued { position }
            }
            Err(SummarizerError::QueueFull) => {
                warn!(%job_id, chat_id, capacity = self.queue.capacity(), "queue full, job rejected");
                self.reply(chat_id, notices::QUEUE_FULL).await;
                AdmissionOutcome::QueueFull
            }
            Err(e) => {
                warn!(%job_id, chat_id, error = %e, "job queue closed, job rejected");
                self.reply(chat_id, notices::FAILED).await;
                AdmissionOutcome::Closed
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }
}

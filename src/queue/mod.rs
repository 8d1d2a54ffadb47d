use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::chat::ChatId;
use crate::SummarizerError;

pub mod admission;
pub mod worker;

pub use admission::{Admission, AdmissionOutcome};
pub use worker::Worker;

/// Pending jobs beyond this are rejected
pub const DEFAULT_CAPACITY: usize = 200;

/// One submitted link awaiting processing
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub url: String,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(chat_id: ChatId, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            url: url.into(),
            enqueued_at: Utc::now(),
        }
    }
}

/// Lifecycle of a job, logged at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Submitted => "submitted",
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Producer half of the bounded FIFO job buffer
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
}

/// Consumer half, owned by the single worker
#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::Receiver<Job>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` pending jobs
    pub fn bounded(capacity: usize) -> (JobQueue, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (JobQueue { sender }, JobReceiver { receiver })
    }

    /// Enqueue without waiting; returns the number of pending jobs including this one.
    ///
    /// The slot is reserved before the length is read, so a worker already
    /// waiting in `recv` cannot take the job before its position is known.
    pub fn try_enqueue(&self, job: Job) -> Result<usize, SummarizerError> {
        let permit = match self.sender.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => return Err(SummarizerError::QueueFull),
            Err(TrySendError::Closed(())) => return Err(SummarizerError::Cancelled),
        };
        let position = self.len();
        permit.send(job);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl JobReceiver {
    /// Next job in enqueue order, `None` once every producer is gone
    pub async fn recv(&mut self) -> Option<Job> {
        self.receiver.recv().await
    }
}

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{Job, JobReceiver, JobState};
use crate::chat::{notices, ChatId, ChatTransport};
use crate::pipeline::SummarizeVideo;
use crate::utils::format_duration;
use crate::SummarizerError;

pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_TASK_INTERVAL: Duration = Duration::from_secs(3);

/// Sole consumer of the job queue; processes one job at a time in FIFO order
pub struct Worker {
    summarize: Arc<SummarizeVideo>,
    transport: Arc<dyn ChatTransport>,
    job_timeout: Duration,
    task_interval: Duration,
}

impl Worker {
    pub fn new(
        summarize: Arc<SummarizeVideo>,
        transport: Arc<dyn ChatTransport>,
        job_timeout: Duration,
        task_interval: Duration,
    ) -> Self {
        Self {
            summarize,
            transport,
            job_timeout,
            task_interval,
        }
    }

    /// Process jobs until `cancel` fires or every producer is dropped.
    ///
    /// A failed job never stops the loop.
    pub async fn run(&self, mut receiver: JobReceiver, cancel: CancellationToken) {
        info!(
            job_timeout = %format_duration(self.job_timeout),
            task_interval = %format_duration(self.task_interval),
            "worker started"
        );

        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            self.process(job, &cancel).await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.task_interval) => {}
            }
        }

        info!("worker stopped");
    }

    async fn process(&self, job: Job, cancel: &CancellationToken) {
        let waited_ms = (Utc::now() - job.enqueued_at).num_milliseconds().max(0);
        info!(
            job_id = %job.id,
            chat_id = job.chat_id,
            waited_ms,
            state = %JobState::Processing,
            "processing job"
        );
        self.notify(job.chat_id, notices::PROCESSING, cancel).await;
        if cancel.is_cancelled() {
            return;
        }

        let started = Instant::now();
        let job_cancel = cancel.child_token();
        let result = match tokio::time::timeout(self.job_timeout, self.summarize.execute(&job.url, &job_cancel)).await {
            Ok(result) => result,
            Err(_) => {
                job_cancel.cancel();
                Err(SummarizerError::Timeout(self.job_timeout).into())
            }
        };
        let elapsed = format_duration(started.elapsed());

        match result {
            Ok(summary) => {
                info!(job_id = %job.id, chat_id = job.chat_id, elapsed = %elapsed, state = %JobState::Completed, "job completed");
                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        warn!(job_id = %job.id, chat_id = job.chat_id, "summary delivery cancelled");
                        return;
                    }
                    sent = self.transport.send_summary(job.chat_id, &summary) => sent,
                };
                if let Err(e) = sent {
                    error!(job_id = %job.id, chat_id = job.chat_id, error = %e, "failed to send summary");
                }
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    chat_id = job.chat_id,
                    elapsed = %elapsed,
                    state = %JobState::Failed,
                    error = %format!("{:#}", e),
                    "failed to summarize video"
                );
                self.notify(job.chat_id, notices::failure(&e), cancel).await;
            }
        }
    }

    /// Send a notice unless the run is cancelled first
    async fn notify(&self, chat_id: ChatId, text: &str, cancel: &CancellationToken) {
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = self.transport.send_text(chat_id, text) => sent,
        };
        if let Err(e) = sent {
            warn!(chat_id, error = %e, "failed to send notice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobQueue;
    use crate::subtitles::MemorySubtitleStore;
    use crate::summarize::MockSummarizer;
    use crate::transcript::{MockTranscriptProvider, TranscriptProvider};
    use crate::video::VideoId;
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn summaries(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|(_, text)| text.strip_prefix("summary:").map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }

        async fn send_summary(&self, chat_id: ChatId, summary: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, format!("summary:{}", summary)));
            Ok(())
        }
    }

    /// Echoes the last line of the prompt, which is the transcript
    fn echo_summarizer() -> MockSummarizer {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|prompt| Ok(prompt.lines().last().unwrap_or_default().to_string()));
        summarizer
    }

    fn worker(transcripts: Arc<dyn TranscriptProvider>, transport: &Arc<RecordingTransport>) -> Worker {
        worker_with(transcripts, transport.clone(), DEFAULT_TASK_INTERVAL)
    }

    fn worker_with(
        transcripts: Arc<dyn TranscriptProvider>,
        transport: Arc<dyn ChatTransport>,
        task_interval: Duration,
    ) -> Worker {
        let pipeline = SummarizeVideo::new(
            transcripts,
            Arc::new(echo_summarizer()),
            Arc::new(MemorySubtitleStore::default()),
            "Russian",
        );
        Worker::new(Arc::new(pipeline), transport, DEFAULT_JOB_TIMEOUT, task_interval)
    }

    /// Waits for its token, remembering that it saw the cancellation
    #[derive(Default)]
    struct WaitsForCancel {
        saw_cancel: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl TranscriptProvider for WaitsForCancel {
        async fn fetch_transcript(
            &self,
            _video_id: &VideoId,
            cancel: &CancellationToken,
        ) -> std::result::Result<String, SummarizerError> {
            cancel.cancelled().await;
            self.saw_cancel.store(true, Ordering::SeqCst);
            Err(SummarizerError::Cancelled)
        }
    }

    /// Transport whose requests never complete
    struct Unresponsive;

    #[async_trait]
    impl ChatTransport for Unresponsive {
        async fn send_text(&self, _chat_id: ChatId, _text: &str) -> Result<()> {
            std::future::pending().await
        }

        async fn send_summary(&self, _chat_id: ChatId, _summary: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    async fn stops_within(handle: tokio::task::JoinHandle<()>, limit: Duration) -> bool {
        tokio::time::timeout(limit, handle).await.is_ok()
    }

    fn transcript_per_video() -> MockTranscriptProvider {
        let mut transcripts = MockTranscriptProvider::new();
        transcripts
            .expect_fetch_transcript()
            .returning(|video_id, _| Ok(format!("transcript {}", video_id)));
        transcripts
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_complete_in_enqueue_order() {
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(Arc::new(transcript_per_video()), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        for (chat_id, id) in [(1, "aaa"), (2, "bbb"), (3, "ccc")] {
            queue.try_enqueue(Job::new(chat_id, format!("https://youtu.be/{}", id))).unwrap();
        }
        drop(queue);

        worker.run(receiver, CancellationToken::new()).await;

        assert_eq!(
            transport.summaries(),
            vec!["transcript aaa", "transcript bbb", "transcript ccc"]
        );
        let sent = transport.sent();
        assert_eq!(sent[0], (1, notices::PROCESSING.to_string()));
        assert_eq!(sent[1], (1, "summary:transcript aaa".to_string()));
        assert_eq!(sent[2].0, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_more_than_one_job_in_flight() {
        #[derive(Default)]
        struct Slow {
            in_flight: AtomicUsize,
            max_in_flight: AtomicUsize,
        }

        #[async_trait]
        impl TranscriptProvider for Slow {
            async fn fetch_transcript(
                &self,
                video_id: &VideoId,
                _cancel: &CancellationToken,
            ) -> std::result::Result<String, SummarizerError> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(video_id.to_string())
            }
        }

        let slow = Arc::new(Slow::default());
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(slow.clone(), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        for id in ["aaa", "bbb", "ccc", "ddd"] {
            queue.try_enqueue(Job::new(1, format!("youtu.be/{}", id))).unwrap();
        }
        drop(queue);

        let started = Instant::now();
        worker.run(receiver, CancellationToken::new()).await;

        assert_eq!(slow.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(transport.summaries().len(), 4);
        // four fetches and four pacing delays, strictly one after another
        assert!(started.elapsed() >= Duration::from_secs(4 * 10 + 4 * 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_sends_notice_and_continues() {
        let mut transcripts = MockTranscriptProvider::new();
        transcripts
            .expect_fetch_transcript()
            .returning(|video_id, _| {
                if video_id.as_str() == "bad" {
                    Err(SummarizerError::NoSubtitles)
                } else {
                    Ok("fine".to_string())
                }
            });

        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(Arc::new(transcripts), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        queue.try_enqueue(Job::new(1, "youtu.be/bad")).unwrap();
        queue.try_enqueue(Job::new(2, "vimeo.com/123 youtu")).unwrap();
        queue.try_enqueue(Job::new(3, "youtu.be/good")).unwrap();
        drop(queue);

        worker.run(receiver, CancellationToken::new()).await;

        let sent = transport.sent();
        assert!(sent.contains(&(1, notices::NO_SUBTITLES.to_string())));
        assert!(sent.contains(&(2, notices::BAD_LINK.to_string())));
        assert!(sent.contains(&(3, "summary:fine".to_string())));
        assert!(sent.iter().all(|(_, text)| !text.contains("fetch transcript")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_timeout_reports_failure() {
        struct Stalled;

        #[async_trait]
        impl TranscriptProvider for Stalled {
            async fn fetch_transcript(
                &self,
                _video_id: &VideoId,
                _cancel: &CancellationToken,
            ) -> std::result::Result<String, SummarizerError> {
                std::future::pending().await
            }
        }

        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(Arc::new(Stalled), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        queue.try_enqueue(Job::new(7, "youtu.be/slow")).unwrap();
        drop(queue);

        let started = Instant::now();
        worker.run(receiver, CancellationToken::new()).await;

        assert!(started.elapsed() >= DEFAULT_JOB_TIMEOUT);
        assert_eq!(
            transport.sent(),
            vec![
                (7, notices::PROCESSING.to_string()),
                (7, notices::FAILED.to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_on_cancel() {
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(Arc::new(transcript_per_video()), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { worker.run(receiver, cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert!(transport.sent().is_empty());
        drop(queue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reaches_in_flight_job() {
        let provider = Arc::new(WaitsForCancel::default());
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker(provider.clone(), &transport);

        let (queue, receiver) = JobQueue::bounded(10);
        queue.try_enqueue(Job::new(4, "youtu.be/abc123")).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { worker.run(receiver, cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!provider.saw_cancel.load(Ordering::SeqCst));
        cancel.cancel();

        assert!(stops_within(handle, Duration::from_secs(1)).await);
        assert!(provider.saw_cancel.load(Ordering::SeqCst));
        assert_eq!(transport.sent(), vec![(4, notices::PROCESSING.to_string())]);
        drop(queue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_pacing_delay() {
        let transport = Arc::new(RecordingTransport::default());
        let worker = worker_with(
            Arc::new(transcript_per_video()),
            transport.clone(),
            Duration::from_secs(3600),
        );

        let (queue, receiver) = JobQueue::bounded(10);
        queue.try_enqueue(Job::new(1, "youtu.be/aaa")).unwrap();
        queue.try_enqueue(Job::new(2, "youtu.be/bbb")).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { worker.run(receiver, cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.summaries(), vec!["transcript aaa"]);
        cancel.cancel();

        assert!(stops_within(handle, Duration::from_secs(1)).await);
        assert_eq!(transport.summaries(), vec!["transcript aaa"]);
        drop(queue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_transport_stalls() {
        let worker = worker_with(
            Arc::new(transcript_per_video()),
            Arc::new(Unresponsive),
            DEFAULT_TASK_INTERVAL,
        );

        let (queue, receiver) = JobQueue::bounded(10);
        queue.try_enqueue(Job::new(1, "youtu.be/aaa")).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { worker.run(receiver, cancel).await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert!(stops_within(handle, Duration::from_secs(1)).await);
        drop(queue);
    }
}

use async_trait::async_trait;

use crate::{Result, SummarizerError};

pub mod telegram;

pub use telegram::{TelegramBot, TelegramClient};

/// Opaque handle of the chat a request came from
pub type ChatId = i64;

/// Delivers replies back to the submitter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain-text notice
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Send a finished summary, rendered with the transport's markup
    async fn send_summary(&self, chat_id: ChatId, summary: &str) -> Result<()>;
}

/// User-visible texts
pub mod notices {
    use super::SummarizerError;

    pub const GUIDANCE: &str = "Пришлите ссылку на YouTube видео.";
    pub const QUEUE_FULL: &str = "Очередь переполнена, попробуйте позже.";
    pub const PROCESSING: &str = "Начинаю обработку... Это может занять несколько минут.";
    pub const FAILED: &str = "Не удалось обработать видео, попробуйте позже.";
    pub const BAD_LINK: &str = "Не удалось распознать ссылку на видео.";
    pub const NO_SUBTITLES: &str = "У этого видео нет доступных субтитров.";

    pub fn queued(position: usize) -> String {
        format!("Ссылка добавлена в очередь. Позиция: {}", position)
    }

    /// Short failure text for the submitter, never the internal error chain
    pub fn failure(error: &anyhow::Error) -> &'static str {
        match error.downcast_ref::<SummarizerError>() {
            Some(SummarizerError::InvalidInput(_)) | Some(SummarizerError::UnsupportedHost(_)) => BAD_LINK,
            Some(SummarizerError::NoSubtitles) | Some(SummarizerError::EmptyTranscript) => NO_SUBTITLES,
            _ => FAILED,
        }
    }
}

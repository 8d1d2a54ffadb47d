use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{ChatId, ChatTransport};
use crate::queue::Admission;
use crate::utils::split_message;
use crate::Result;

/// Telegram rejects longer message texts
pub const MESSAGE_LIMIT: usize = 4096;

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(3);
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

/// Minimal Telegram Bot API client
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
    send_timeout: Duration,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, token: &str, poll_timeout: Duration) -> Self {
        Self::with_api_url(client, DEFAULT_API_URL, token, poll_timeout)
    }

    pub fn with_api_url(client: reqwest::Client, api_url: &str, token: &str, poll_timeout: Duration) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            poll_timeout,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Upper bound for a single `sendMessage` request
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Long-poll for updates newer than `offset`
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };

        let resp = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .timeout(self.poll_timeout + Duration::from_secs(10))
            .json(&request)
            .send()
            .await
            .context("Failed to poll Telegram updates")?;

        let body: ApiResponse<Vec<Update>> = resp
            .json()
            .await
            .context("Failed to parse Telegram updates")?;
        into_result(body)
    }

    /// Send one message; `text` must already fit in [`MESSAGE_LIMIT`]
    pub async fn send_message(&self, chat_id: ChatId, text: &str, parse_mode: Option<&str>) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .timeout(self.send_timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send Telegram message")?;

        let body: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .context("Failed to parse Telegram response")?;
        into_result(body).map(|_| ())
    }
}

fn into_result<T>(body: ApiResponse<T>) -> Result<T> {
    if !body.ok {
        anyhow::bail!(
            "Telegram API error: {}",
            body.description.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    body.result.context("Telegram API returned no result")
}

/// Offset that acknowledges every update in `updates`
fn next_offset(updates: &[Update], current: i64) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .map_or(current, |next| next.max(current))
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            self.send_message(chat_id, &chunk, None).await?;
        }
        Ok(())
    }

    async fn send_summary(&self, chat_id: ChatId, summary: &str) -> Result<()> {
        for chunk in split_message(summary, MESSAGE_LIMIT) {
            if let Err(e) = self.send_message(chat_id, &chunk, Some("Markdown")).await {
                warn!(chat_id, error = %e, "markdown rejected, resending as plain text");
                self.send_message(chat_id, &chunk, None).await?;
            }
        }
        Ok(())
    }
}

/// Long-polling front end feeding inbound texts into admission
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    admission: Admission,
}

impl TelegramBot {
    pub fn new(client: Arc<TelegramClient>, admission: Admission) -> Self {
        Self { client, admission }
    }

    /// Poll until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!("Telegram bot started polling");
        let mut offset = 0;

        loop {
            let updates = tokio::select! {
                _ = cancel.cancelled() => break,
                updates = self.client.get_updates(offset) => updates,
            };

            match updates {
                Ok(updates) => {
                    offset = next_offset(&updates, offset);
                    for update in updates {
                        let Some(message) = update.message else {
                            continue;
                        };
                        let Some(text) = message.text else {
                            continue;
                        };
                        debug!(chat_id = message.chat.id, update_id = update.update_id, "received message");
                        self.admission.admit(message.chat.id, &text).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to fetch updates");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_PAUSE) => {}
                    }
                }
            }
        }

        info!("Telegram bot stopped polling");
        Ok(())
    }
}

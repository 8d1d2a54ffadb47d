use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::queue::DEFAULT_CAPACITY;
use crate::transcript::{LanguageGroup, RetryPolicy};
use crate::utils::mask_secret;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram bot settings
    pub telegram: TelegramConfig,

    /// OpenAI settings
    pub openai: OpenAiConfig,

    /// Subtitle acquisition settings
    pub transcript: TranscriptConfig,

    /// Job queue settings
    pub queue: QueueConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub token: String,

    /// Long-poll timeout in seconds
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Path to the yt-dlp executable
    pub yt_dlp_path: String,

    /// Directory subtitle artifacts are written to
    pub subtitles_dir: PathBuf,

    /// Language tags tried first
    pub primary_languages: Vec<String>,

    /// Language tags tried once the primary group is exhausted
    pub fallback_languages: Vec<String>,

    /// Attempts per language tag while rate limited
    pub max_attempts: u32,

    /// First backoff delay in seconds, doubled after every rate-limited attempt
    pub initial_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum pending jobs
    pub capacity: usize,

    /// Per-job processing deadline in seconds
    pub job_timeout_secs: u64,

    /// Delay between jobs in seconds
    pub task_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `development` or `production`
    pub environment: String,

    /// Language summaries are written in
    pub summary_language: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            poll_timeout_secs: 60,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.3,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            subtitles_dir: PathBuf::from("."),
            primary_languages: vec!["ru".to_string(), "ru.*".to_string()],
            fallback_languages: vec!["en".to_string(), "en.*".to_string()],
            max_attempts: 3,
            initial_backoff_secs: 5,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            job_timeout_secs: 180,
            task_interval_secs: 3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            summary_language: "Russian".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.resolve_yt_dlp_path()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("video-summarizer").join("config.yaml"))
    }

    /// Overlay values from environment-style variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(path) = get("YT_DLP_PATH") {
            self.transcript.yt_dlp_path = path;
        }
        if let Some(env) = get("APP_ENV") {
            self.app.environment = env;
        }
        if let Some(raw) = get("TASK_INTERVAL_SECONDS") {
            self.queue.task_interval_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => QueueConfig::default().task_interval_secs,
            };
        }
    }

    /// A relative executable path with a separator is taken from the working directory
    fn resolve_yt_dlp_path(&mut self) -> Result<()> {
        let path = Path::new(&self.transcript.yt_dlp_path);
        if path.is_relative() && path.components().count() > 1 {
            let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
            self.transcript.yt_dlp_path = cwd.join(path).to_string_lossy().into_owned();
        }
        Ok(())
    }

    /// Checks shared by every command that processes videos
    fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            anyhow::bail!("OpenAI API key must be configured (OPENAI_API_KEY)");
        }
        if self.queue.capacity == 0 {
            anyhow::bail!("Queue capacity must be at least 1");
        }
        if self.transcript.max_attempts == 0 {
            anyhow::bail!("Max attempts must be at least 1");
        }
        if self.language_groups().is_empty() {
            anyhow::bail!("At least one subtitle language must be configured");
        }
        Ok(())
    }

    /// Requirements of the chat bot
    pub fn validate_for_bot(&self) -> Result<()> {
        if self.telegram.token.is_empty() {
            anyhow::bail!("Telegram bot token must be configured (TELEGRAM_BOT_TOKEN)");
        }
        self.validate()
    }

    /// Requirements of one-shot summarization
    pub fn validate_for_summarize(&self) -> Result<()> {
        self.validate()
    }

    pub fn is_production(&self) -> bool {
        self.app.environment.eq_ignore_ascii_case("production")
    }

    fn language_groups(&self) -> Vec<LanguageGroup> {
        [&self.transcript.primary_languages, &self.transcript.fallback_languages]
            .into_iter()
            .map(|tags| LanguageGroup::new(tags.iter().filter(|t| !t.trim().is_empty()).cloned()))
            .filter(|group| !group.tags.is_empty())
            .collect()
    }

    /// Retry policy built from the transcript section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            groups: self.language_groups(),
            max_attempts: self.transcript.max_attempts.max(1),
            initial_backoff: Duration::from_secs(self.transcript.initial_backoff_secs),
        }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.queue.job_timeout_secs)
    }

    pub fn task_interval(&self) -> Duration {
        Duration::from_secs(self.queue.task_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram.poll_timeout_secs)
    }

    /// Display current configuration with secrets masked
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Environment: {}", self.app.environment);
        println!("  Telegram Token: {}", mask_secret(&self.telegram.token));
        println!("  OpenAI API Key: {}", mask_secret(&self.openai.api_key));
        println!("  OpenAI Model: {}", self.openai.model);
        println!("  Summary Language: {}", self.app.summary_language);
        println!("  yt-dlp: {}", self.transcript.yt_dlp_path);
        println!("  Subtitles Dir: {}", self.transcript.subtitles_dir.display());
        println!(
            "  Languages: {} then {}",
            self.transcript.primary_languages.join(","),
            self.transcript.fallback_languages.join(",")
        );
        println!("  Queue Capacity: {}", self.queue.capacity);
        println!("  Job Timeout: {}s", self.queue.job_timeout_secs);
        println!("  Task Interval: {}s", self.queue.task_interval_secs);
    }
}

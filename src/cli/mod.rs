use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "summarizer-bot",
    about = "Video Summarizer - Telegram bot that turns YouTube links into short summaries",
    version,
    long_about = "A chat bot and CLI that downloads YouTube subtitles with yt-dlp, flattens them into a transcript and summarizes it with OpenAI. Links sent to the bot are queued and processed one at a time."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Telegram bot
    Run,

    /// Summarize a single video
    Summarize {
        /// YouTube link (watch, shorts, youtu.be)
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the flattened subtitle transcript of a video
    Transcript {
        /// YouTube link (watch, shorts, youtu.be)
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Print the video identifier of a link
    Resolve {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Write the default configuration file or show the current one
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with video metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_summarizer::chat::{TelegramBot, TelegramClient};
use video_summarizer::output::{self, SummaryReport};
use video_summarizer::queue::JobReceiver;
use video_summarizer::subtitles::FsSubtitleStore;
use video_summarizer::summarize::OpenAiSummarizer;
use video_summarizer::ytdlp::YtDlpRunner;
use video_summarizer::{
    utils, video, Admission, Cli, Commands, Config, JobQueue, SummarizeVideo, TranscriptAcquirer, Worker,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Pure command, needs neither configuration nor tools
    if let Commands::Resolve { url } = &cli.command {
        let video_id = video::resolve(url)?;
        println!("{}", video_id);
        return Ok(());
    }

    let config = Config::load()?;
    init_tracing(&config, cli.verbose);

    // Check for required external dependencies (non-fatal)
    let missing_deps = utils::check_dependencies(&config.transcript.yt_dlp_path).await;
    if !missing_deps.is_empty() {
        eprintln!("{}", style("⚠️  Dependency check warnings:").yellow());
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    match cli.command {
        Commands::Run => {
            config.validate_for_bot()?;
            run_bot(&config).await?;
        }
        Commands::Summarize { url, output, format } => {
            config.validate_for_summarize()?;
            let pipeline = build_pipeline(&config, reqwest::Client::new());
            let cancel = cancel_on_shutdown();

            info!("Starting summary for URL: {}", url);
            let progress = spinner("Fetching subtitles and summarizing...");
            let result = pipeline.execute(&url, &cancel).await;
            progress.finish_and_clear();
            let summary = result?;

            let video_id = video::resolve(&url)?;
            let report = SummaryReport {
                url: video_id.watch_url(),
                video_id: video_id.to_string(),
                model: config.openai.model.clone(),
                summary,
                generated_at: chrono::Utc::now(),
            };

            match output {
                Some(path) => {
                    output::save_to_file(&report, &path, &format)?;
                    println!("{} {}", style("Summary saved to:").green(), path.display());
                }
                None => {
                    output::print_to_console(&report, &format)?;
                }
            }
        }
        Commands::Transcript { url } => {
            let pipeline = build_pipeline(&config, reqwest::Client::new());
            let cancel = cancel_on_shutdown();

            let progress = spinner("Fetching subtitles...");
            let result = pipeline.transcript(&url, &cancel).await;
            progress.finish_and_clear();

            println!("{}", result?);
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = config.save()?;
                println!("Configuration written to: {}", path.display());
                println!("Edit it or override values with environment variables (see .env).");
            }
        }
        Commands::Resolve { .. } => {}
    }

    Ok(())
}

fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose || !config.is_production() {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("video_summarizer={level},summarizer_bot={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_pipeline(config: &Config, http: reqwest::Client) -> SummarizeVideo {
    let policy = config.retry_policy();
    let store = Arc::new(FsSubtitleStore::new(
        config.transcript.subtitles_dir.clone(),
        policy.preferred_languages(),
    ));
    let runner = Arc::new(YtDlpRunner::new(&config.transcript.yt_dlp_path));
    let acquirer = TranscriptAcquirer::new(runner, store.clone(), policy);
    let summarizer = OpenAiSummarizer::new(http, &config.openai, &config.app.summary_language);

    SummarizeVideo::new(
        Arc::new(acquirer),
        Arc::new(summarizer),
        store,
        config.app.summary_language.clone(),
    )
}

async fn run_bot(config: &Config) -> Result<()> {
    let http = reqwest::Client::new();
    let pipeline = Arc::new(build_pipeline(config, http.clone()));
    let client = Arc::new(TelegramClient::new(http, &config.telegram.token, config.poll_timeout()));

    let (queue, receiver) = JobQueue::bounded(config.queue.capacity);
    let admission = Admission::new(queue, client.clone());
    let worker = Worker::new(pipeline, client.clone(), config.job_timeout(), config.task_interval());

    let cancel = cancel_on_shutdown();
    let worker_handle = spawn_worker(worker, receiver, cancel.clone());

    let bot = TelegramBot::new(client, admission);
    let result = bot.run(cancel.clone()).await;

    cancel.cancel();
    worker_handle.await.ok();
    info!("Bot shutdown complete");
    result
}

fn spawn_worker(worker: Worker, receiver: JobReceiver, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { worker.run(receiver, cancel).await })
}

/// Token cancelled on SIGINT or SIGTERM
fn cancel_on_shutdown() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        token.cancel();
    });
    cancel
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

//! moodlog-ma - Mood-analyzed journal
//!
//! Command-line front end for the journal: writes text entries, records video
//! entries, and checks on their mood analysis. Entries live in a SQLite
//! database under the root folder; analysis runs against the configured
//! sentiment and emotion providers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use moodlog_common::config::{self, TomlConfig};
use moodlog_common::events::EventBus;
use moodlog_ma::db::{self, SqliteEntryRepository};
use moodlog_ma::models::{Entry, EntryKind, MediaRef, Modality};
use moodlog_ma::services::{HttpEmotionClient, HttpSentimentClient};
use moodlog_ma::{EntryStore, ReconcileOutcome, RetryPolicy};

/// Command-line arguments for moodlog-ma
#[derive(Parser, Debug)]
#[command(name = "moodlog-ma")]
#[command(about = "Journal with asynchronous mood analysis")]
#[command(version)]
struct Args {
    /// Root folder holding the journal database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Principal whose entries are read and written
    #[arg(long, global = true, env = "MOODLOG_OWNER", default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a text entry and analyze its mood
    Write { text: String },

    /// Record a video entry and submit it for emotion analysis
    Record {
        media_url: String,

        /// Video length in seconds
        #[arg(long)]
        duration: f64,

        #[arg(long)]
        thumbnail: Option<String>,
    },

    /// List entries, newest first
    List,

    /// Check the emotion analysis job of a video entry
    Check { id: Uuid },

    /// Re-run analysis for an entry whose analysis failed
    Retry { id: Uuid },

    /// Delete an entry
    Delete { id: Uuid },
}

impl Command {
    /// (sentiment, emotion) providers this command calls
    fn required_providers(&self) -> (bool, bool) {
        match self {
            Command::Write { .. } => (true, false),
            Command::Record { .. } | Command::Check { .. } => (false, true),
            Command::Retry { .. } => (true, true),
            Command::List | Command::Delete { .. } => (false, false),
        }
    }
}

fn init_tracing(logging: &config::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Resolve an API key, tolerating its absence when the command never calls the provider
fn api_key(required: bool, service: &str, env_var: &str, toml_value: Option<&String>) -> Result<String> {
    match config::resolve_api_key(service, env_var, toml_value) {
        Ok(key) => Ok(key),
        Err(e) if required => Err(e.into()),
        Err(_) => Ok(String::new()),
    }
}

fn describe(entry: &Entry) -> String {
    let created = entry.created_at.format("%Y-%m-%d %H:%M");
    match &entry.kind {
        EntryKind::Text(text) => {
            let mood = match &text.mood {
                Some(mood) => format!(
                    "{:?} (happiness {:.2}, sadness {:.2}, anger {:.2}, fear {:.2})",
                    mood.sentiment, mood.happiness, mood.sadness, mood.anger, mood.fear
                ),
                None => "-".to_string(),
            };
            format!(
                "{}  {}  text   {:<7}  {}\n    {}",
                entry.id, created, entry.status, mood, text.content
            )
        }
        EntryKind::Video(video) => {
            let emotion = match &video.emotion {
                Some(data) => Modality::ALL
                    .iter()
                    .filter_map(|m| {
                        data.dominant(*m)
                            .map(|e| format!("{}: {} {:.2}", m.as_str(), e.name, e.score))
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                None => "-".to_string(),
            };
            format!(
                "{}  {}  video  {:<7}  {}\n    {} ({:.0}s){}",
                entry.id,
                created,
                entry.status,
                emotion,
                video.media_url,
                video.duration,
                video
                    .job_id
                    .as_deref()
                    .map(|job| format!(" job {}", job))
                    .unwrap_or_default()
            )
        }
    }
}

async fn run(store: &EntryStore, command: Command) -> Result<()> {
    match command {
        Command::Write { text } => {
            let entry = store.create_text(text).await.context("Failed to write entry")?;
            store.wait_idle().await;
            let entry = store.get(entry.id).await.unwrap_or(entry);
            println!("{}", describe(&entry));
        }
        Command::Record {
            media_url,
            duration,
            thumbnail,
        } => {
            let media = match thumbnail {
                Some(thumbnail) => MediaRef::new(media_url).with_thumbnail(thumbnail),
                None => MediaRef::new(media_url),
            };
            let entry = store
                .create_video(media, duration)
                .await
                .context("Failed to record entry")?;
            store.wait_idle().await;
            let entry = store.get(entry.id).await.unwrap_or(entry);
            println!("{}", describe(&entry));
        }
        Command::List => {
            let entries = store.list().await;
            if entries.is_empty() {
                println!("No entries");
            }
            for entry in entries {
                println!("{}", describe(&entry));
            }
        }
        Command::Check { id } => {
            let outcome = store.reconcile(id).await.context("Failed to check entry")?;
            let message = match outcome {
                ReconcileOutcome::StillProcessing => "Analysis still in progress".to_string(),
                ReconcileOutcome::Completed => "Analysis completed".to_string(),
                ReconcileOutcome::Failed => "Analysis failed".to_string(),
                ReconcileOutcome::Unavailable => {
                    "Emotion provider unavailable, try again later".to_string()
                }
                ReconcileOutcome::Settled(status) => format!("Nothing to check (status {})", status),
            };
            println!("{}", message);
            store.wait_idle().await;
            if let Some(entry) = store.get(id).await {
                println!("{}", describe(&entry));
            }
        }
        Command::Retry { id } => {
            store.reanalyze(id).await.context("Failed to retry analysis")?;
            store.wait_idle().await;
            if let Some(entry) = store.get(id).await {
                println!("{}", describe(&entry));
            }
        }
        Command::Delete { id } => {
            store.remove(id).await.context("Failed to delete entry")?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match config::resolve_config_path(args.config.as_deref()) {
        Some(path) => config::load_toml_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config.logging)?;
    info!("Starting moodlog-ma v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = config::database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open journal database")?;
    let repository = Arc::new(SqliteEntryRepository::new(pool, Some(args.owner.clone())));

    let (needs_sentiment, needs_emotion) = args.command.required_providers();
    let sentiment_key = api_key(
        needs_sentiment,
        "Sentiment",
        config::SENTIMENT_API_KEY_ENV,
        toml_config.sentiment.api_key.as_ref(),
    )?;
    let emotion_key = api_key(
        needs_emotion,
        "Emotion",
        config::EMOTION_API_KEY_ENV,
        toml_config.emotion.api_key.as_ref(),
    )?;

    let sentiment = Arc::new(HttpSentimentClient::from_config(&toml_config.sentiment, sentiment_key)?);
    let emotion = Arc::new(HttpEmotionClient::from_config(&toml_config.emotion, emotion_key)?);

    let store = EntryStore::new(
        repository,
        sentiment,
        emotion,
        RetryPolicy::from_config(&toml_config.retry),
        EventBus::default(),
    );
    store.refresh().await.context("Failed to load journal entries")?;

    let result = run(&store, args.command).await;
    store.wait_idle().await;
    result
}

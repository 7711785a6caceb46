use clap::Parser;
use mitya_core::config::BotConfig;
use mitya_core::MityaConfig;
use mitya_memory::{SqliteStore, StoreConfig};
use mitya_reasoning::{
    ChatModel, CompletionParams, ConversationEngine, OllamaClient, SentimentClassifier,
};
use mitya_voice::{SpeechToText, WhisperHttpClient};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod fun;
mod handlers;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "mitya.toml")]
    config: String,

    /// Override the database path
    #[arg(long)]
    db: Option<String>,
}

/// Shared handler state.
pub struct App {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<ConversationEngine>,
    pub classifier: Arc<SentimentClassifier>,
    pub stt: Option<Arc<dyn SpeechToText>>,
    pub cfg: BotConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // The token is the one thing the bot cannot run without
    let token =
        std::env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN is not set"))?;

    let config = MityaConfig::load_or_default(&args.config);
    let db_path = args.db.unwrap_or_else(|| config.storage.db_path.clone());

    info!("Opening database at {}...", db_path);
    let store = Arc::new(
        SqliteStore::new(
            &db_path,
            StoreConfig {
                context_window: config.engine.context_window,
                recency_window_hours: match config.engine.recency_window_hours {
                    0 => None,
                    hours => Some(hours),
                },
            },
        )
        .await?,
    );

    info!(
        "Completion endpoint: {} (model {})",
        config.llm.base_url, config.llm.model
    );
    let mut client = OllamaClient::new(
        &config.llm.base_url,
        &config.llm.model,
        Duration::from_secs(config.llm.request_timeout_secs),
    )?;
    if let Some(api_token) = &config.llm.api_token {
        client = client.with_api_token(api_token);
    }
    let model: Arc<dyn ChatModel> = Arc::new(client);

    let classifier = Arc::new(SentimentClassifier::new(
        model.clone(),
        Duration::from_secs(config.llm.classifier_timeout_secs),
        &config.engine.language,
    ));

    let engine = Arc::new(ConversationEngine::new(
        store.clone(),
        store.clone(),
        model,
        &config.engine.language,
        CompletionParams {
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        },
    ));

    let stt: Option<Arc<dyn SpeechToText>> = match &config.voice.whisper_url {
        Some(url) => {
            info!("Voice transcription via {}", url);
            Some(Arc::new(WhisperHttpClient::new(
                url,
                Some(&config.voice.language),
                Duration::from_secs(config.voice.request_timeout_secs),
            )?))
        }
        None => {
            info!("No transcription endpoint configured, voice notes will be declined");
            None
        }
    };

    let app = Arc::new(App {
        store,
        engine,
        classifier,
        stt,
        cfg: config.bot.clone(),
    });

    let bot = Bot::new(token);
    handlers::set_commands(&bot).await?;

    info!("Митя запущен!");
    handlers::run(bot, app).await;
    Ok(())
}

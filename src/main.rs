//! twochat - session-based chat relay
//!
//! Relays each user message to an OpenRouter model with a bounded slice of the
//! session's history, tags the structured reply with one of 13 emotions, and
//! stores both turns in SQLite.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use twochat::chat::ChatRelay;
use twochat::config::AppConfig;
use twochat::provider::{OpenRouterProvider, Provider};
use twochat::server::{self, AppState};
use twochat::store::{SessionStore, SqliteSessionStore};

#[derive(Parser)]
#[command(name = "twochat")]
#[command(version, about = "Session-based chat relay with emotion tagging")]
struct Args {
    /// Address to bind (overrides TWOCHAT_HOST)
    #[arg(long)]
    host: Option<String>,

    /// HTTP server port (overrides TWOCHAT_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Database path (sqlite URL, overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Config file (default: ~/.twochat/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolve values: CLI args > env vars > config file > defaults
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let provider: Arc<dyn Provider> = Arc::new(OpenRouterProvider::from_config(&config)?);

    let store: Arc<dyn SessionStore> = if args.in_memory {
        info!("Using in-memory database");
        Arc::new(SqliteSessionStore::in_memory().await?)
    } else {
        Arc::new(SqliteSessionStore::connect(&config.database_url).await?)
    };

    info!(
        model = provider.model(),
        max_history_turns = config.context.max_history_turns,
        max_history_chars = config.context.max_history_chars,
        "Starting twochat {}",
        env!("CARGO_PKG_VERSION")
    );

    let relay = ChatRelay::new(store.clone(), provider, config.context.clone());
    let state = AppState::new(store, relay);
    let cors = server::cors_layer(&config.cors_origin)?;

    server::run(&config.bind_address(), state, cors).await
}

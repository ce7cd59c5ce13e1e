//! lockboxd: lockbox HTTP daemon
//!
//! Usage:
//!   lockboxd [--config lockbox.toml] [--listen 127.0.0.1:5000]
//!
//! Serves /encrypt, /decrypt, /history, /healthz and /metrics. Every
//! operation is appended to the shared history log.

mod metrics;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lockbox_core::config::LockboxConfig;
use lockbox_core::{Engine, FileHistory};
use prometheus_client::registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::metrics::OperationMetrics;
use crate::server::AppState;

#[derive(Parser, Debug)]
#[command(name = "lockboxd", version, about = "lockbox file encryption daemon")]
struct Cli {
    /// Path to lockbox.toml configuration file
    #[arg(long, short = 'c', env = "LOCKBOX_CONFIG", default_value = "lockbox.toml")]
    config: PathBuf,

    /// Listen address (overrides daemon.listen)
    #[arg(long, env = "LOCKBOX_LISTEN")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides daemon.log_level
    #[arg(long, env = "LOCKBOX_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides daemon.log_format
    #[arg(long, env = "LOCKBOX_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LockboxConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.daemon.log_level);
    let format = cli
        .log_format
        .clone()
        .or_else(|| LogFormat::from_str(&config.daemon.log_format, true).ok())
        .unwrap_or(LogFormat::Text);
    init_logging(level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "lockboxd starting"
    );
    if !cli.config.exists() {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    let upload_dir = config.upload_dir();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("creating upload dir {}", upload_dir.display()))?;

    let history = Arc::new(FileHistory::new(config.history_path()));
    info!(path = %history.path().display(), "history log");

    let mut registry = Registry::default();
    let metrics = OperationMetrics::new(&mut registry);

    let state = AppState {
        engine: Engine::new(history),
        upload_dir: Arc::new(upload_dir),
        metrics,
        registry: Arc::new(registry),
    };

    let addr = cli.listen.unwrap_or_else(|| config.daemon.listen.clone());
    let app = server::router(state, &config.daemon);
    server::serve(&addr, app).await
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}

//! mcat-api - Music catalog service
//!
//! REST API over artists, albums, songs and genres, backed by SQLite.
//! Cover art and audio files are handed to external storage providers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mcat_common::config::{
    load_toml_config, resolve_config_path, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcat_api::services::UploadServices;
use mcat_api::{build_router, AppState};

/// Command-line arguments for mcat-api
#[derive(Parser, Debug)]
#[command(name = "mcat-api")]
#[command(about = "Music catalog REST service")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding the database (also MCAT_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Database file, overrides `<root>/mcat.db`
    #[arg(short, long, env = "MCAT_DATABASE")]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MCAT_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "MCAT_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read first so its log level can seed the filter
    let config_path = resolve_config_path(args.config.as_deref());
    let config_result = match &config_path {
        Some(path) => load_toml_config(path),
        None => Ok(TomlConfig::default()),
    };
    let fallback_level = config_result
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MCAT catalog (mcat-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("MCAT_GIT_REV"),
        env!("MCAT_BUILT_AT"),
        env!("MCAT_PROFILE")
    );

    let mut config = config_result.context("Failed to load configuration")?;
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file not found at {}; using defaults", path.display()),
        None => warn!("No config directory available; using defaults"),
    }
    config.apply_env_overrides();

    let root_folder = RootFolderResolver::new("mcat-api")
        .with_cli_override(args.root_folder)
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = args
        .database
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(|| initializer.database_path());
    info!("Database: {}", db_path.display());

    let pool = mcat_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database connection established");

    let uploads =
        UploadServices::from_config(&config.uploads).context("Failed to build upload clients")?;

    let state = AppState::new(pool.clone(), uploads, config.server.max_upload_bytes);
    let app = build_router(state);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    pool.close().await;
    info!("Database pool closed");

    served.context("Server error")?;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

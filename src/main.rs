use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use interviewd::compiler::Compiler;
use interviewd::config::Config;
use interviewd::AppState;

#[derive(Parser, Debug)]
#[command(name = "interviewd")]
#[command(author, version, about = "Interview event scheduling service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "interviewd.toml", env = "INTERVIEWD_CONFIG")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "Starting interviewd v{}",
        env!("CARGO_PKG_VERSION")
    );

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    let db = interviewd::db::init(&config.server.data_dir).await?;

    match (&config.auth.admin_email, &config.auth.admin_password) {
        (Some(email), Some(password)) => {
            interviewd::lifecycle::ensure_admin_account(&db, email, password)
                .await
                .context("Failed to bootstrap admin account")?;
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("Both auth.admin_email and auth.admin_password are needed to bootstrap an admin");
        }
        (None, None) => {}
    }

    let compiler = Compiler::from_config(&config.compiler)
        .context("Failed to initialize compiler client")?;

    let mut state = AppState::new(config.clone(), db.clone(), compiler);
    match interviewd::api::metrics::init_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "Metrics disabled"),
    }
    let state = Arc::new(state);

    interviewd::sessions::spawn_cleanup_task(
        db,
        state.live.clone(),
        config.auth.session_cleanup_interval_secs,
    );

    let app = interviewd::api::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

use std::path::PathBuf;
use std::sync::Arc;

use agency_cms::app::build_router;
use agency_cms::config::Settings;
use agency_cms::db::pool::MongoPool;
use agency_cms::demo_seeder::seed_demo_data;
use agency_cms::email::mailer::mailer_from_settings;
use agency_cms::state::{AppState, Repositories};
use anyhow::Context;
use clap::Parser;
use tokio::signal;

#[derive(Debug, Parser)]
#[command(name = "agency-cms", version, about = "Content backend for the agency website")]
struct Args {
    /// Optional settings file. Environment variables override its values.
    #[arg(long, default_value = "agency-cms.toml")]
    config: PathBuf,

    /// Serve sample content from the in-process store.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agency_cms=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;
    settings.demo_mode |= args.demo;

    tracing::info!("Starting agency-cms server...");

    let repos = if settings.demo_mode {
        tracing::info!("Demo mode: using the in-process store");
        Repositories::memory()
    } else {
        let pool = MongoPool::from_settings(&settings)?;
        if !pool.is_configured() {
            tracing::warn!("MONGODB_URI not set, public reads will be empty and writes will fail");
        }
        let repos = Repositories::mongo(Arc::new(pool));
        if let Err(e) = repos.ensure_indexes().await {
            tracing::warn!("Could not ensure indexes: {e}");
        }
        repos
    };

    if settings.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes will reject every request");
    }

    let mailer = mailer_from_settings(&settings)?;
    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(repos, mailer, settings);

    if state.settings.demo_mode {
        seed_demo_data(&state).await;
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!("Listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
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
}

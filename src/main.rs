use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use campus_api::config::{AppConfig, Environment};
use campus_api::routes;
use campus_api::seed;
use campus_api::state::AppState;
use campus_api::store::memory::MemStore;
use campus_api::store::postgres::PgStore;
use campus_api::store::Store;

#[derive(Parser)]
#[command(name = "campus-api", version, about = "Multi-tenant school management API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Load the demo dataset into the configured store.
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_api=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    if config.environment != Environment::Development && config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set outside development");
    }

    tracing::info!(environment = ?config.environment, "starting campus-api");

    let store = build_store(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            seed::run(store, config.security.bcrypt_cost).await?;
        }
        Command::Serve => {
            serve(store, config).await?;
        }
    }

    Ok(())
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, &config.database)
                .await
                .context("failed to connect to postgres")?;
            tracing::info!(
                url = %config.redacted_database_url().unwrap_or_default(),
                "connected to postgres"
            );
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set; using the in-memory store. \
                 All data is lost on shutdown."
            );
            Ok(Arc::new(MemStore::new()))
        }
    }
}

async fn serve(store: Arc<dyn Store>, config: AppConfig) -> Result<()> {
    let port = config.server.port;
    let state = AppState::new(store, config);
    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemObjectStore;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vault_server::config::AppConfig;
use vault_server::database::{ensure_indexes, init_db};
use vault_server::events::CHANNEL_CAPACITY;
use vault_server::mailer::LogSender;
use vault_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;
    if config.auth.jwt_secret.len() < 32 {
        tracing::warn!("auth.jwt_secret is shorter than 32 bytes");
    }

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    ensure_indexes(&db).await.context("Failed to ensure indexes")?;
    info!("Database ready");

    let store = FilesystemObjectStore::new(config.storage.root.clone())
        .await
        .context("Failed to initialize object storage")?;
    info!(root = %config.storage.root.display(), "Object storage ready");

    let (auth_events, _) = broadcast::channel(CHANNEL_CAPACITY);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        store: Arc::new(store),
        mailer: Arc::new(LogSender),
        auth_events,
    };

    let app = vault_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

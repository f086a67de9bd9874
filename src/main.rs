use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use video_uploader::{config::Config, create_app, database::Database, handlers::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_uploader=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if config.imagekit_private_key.is_none() || config.imagekit_public_key.is_none() {
        tracing::warn!("ImageKit keys are not configured; upload credential requests will fail");
    }

    let database = Arc::new(Database::new(&config.database_url).await?);
    database.migrate().await?;
    tracing::info!("Database connected and migrated");

    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(config, database.clone(), database)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server ready and accepting connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

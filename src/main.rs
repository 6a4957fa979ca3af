use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabular_ingest_service::config::ServiceConfig;
use tabular_ingest_service::{http_server, DatabaseManager, IngestEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabular_ingest_service=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tabular Ingest Service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded:");
    info!("  Listen address: {}", config.bind_address());
    info!("  Database URL: {}", config.redacted_database_url());
    info!("  Pool size: {}", config.pool_size);

    let database = DatabaseManager::connect(
        &config.database_url,
        config.pool_size,
        config.pool_timeout,
    )
    .await
    .context("Failed to initialize database")?;
    info!("Registry table ready");

    let engine = IngestEngine::new(database);
    http_server::serve(&config, engine)
        .await
        .context("HTTP server error")?;

    info!("Tabular Ingest Service shutdown complete");
    Ok(())
}

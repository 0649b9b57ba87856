use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use energy_admin_api::config::{config, StoreBackend};
use energy_admin_api::database::{DatabaseManager, MemoryStore, PgStore, Store};
use energy_admin_api::ean::{EanLookup, HttpEanLookup};
use energy_admin_api::is_production;
use energy_admin_api::routes::app;
use energy_admin_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, EAN_LOOKUP_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config();
    tracing::info!("Starting Energy Admin API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            if is_production!() {
                tracing::warn!("Running production with the in-memory store; data is lost on restart");
            }
            Arc::new(MemoryStore::new())
        }
    };

    let lookup: Arc<dyn EanLookup> = Arc::from(HttpEanLookup::from_config(&config.ean)?);
    if !lookup.is_enabled() {
        tracing::info!("EAN lookup disabled (EAN_LOOKUP_URL not set)");
    }

    let state = AppState::new(config.clone(), store, lookup);
    let _purge = state
        .organizations
        .spawn_purge_task(Duration::from_secs(config.organization.purge_interval_secs.max(1)));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Energy Admin API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

//! Farm Inventory - maintenance runner
//!
//! Applies pending migrations in development and re-derives inventory alerts so
//! expiry warnings stay current for items whose stock has not moved.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farm_inventory_backend::{Config, InventoryService, PgInventoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "farm_inventory=debug,farm_inventory_backend=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Farm Inventory maintenance");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    let store = PgInventoryStore::new(db_pool);

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        store.migrate().await?;
        tracing::info!("Migrations completed");
    }

    let service = InventoryService::new(store, config.inventory.policy());
    let refreshed = service.refresh_all_alerts().await?;
    tracing::info!("Alert refresh finished ({} items)", refreshed);

    Ok(())
}

use std::time::Duration;

use pillars_core::config::PostgresConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::StoreError;

fn pool_options(config: &PostgresConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
}

/// Connect to PostgreSQL and apply the bundled migrations.
pub async fn init_pg_pool(config: &PostgresConfig) -> Result<PgPool, StoreError> {
    if !config.is_configured() {
        warn!("PG_URL / PG_USERNAME not set; using defaults for {}", config.host);
    }

    let pool = pool_options(config)
        .connect(&config.database_url())
        .await
        .map_err(StoreError::Unavailable)?;
    info!(host = %config.host, database = %config.database, "PostgreSQL connected");

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Build a pool that connects on first use. Nothing is checked up front.
pub fn connect_lazy(config: &PostgresConfig) -> Result<PgPool, StoreError> {
    pool_options(config)
        .connect_lazy(&config.database_url())
        .map_err(StoreError::from)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations applied successfully");
    Ok(())
}

//! Connection pool provisioning and schema bootstrap.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, DatabaseConfig};

/// Startup failure. Returned to `main`, which decides how the process exits.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to apply the ledger schema: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open a bounded pool and check that the store answers.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, InitError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .connect_with(config.connect_options())
        .await
        .map_err(InitError::Connect)?;

    info!(
        host = %config.address,
        port = config.port,
        database = %config.name,
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Apply the SQL files under `migrations/`. Already-applied files are skipped.
pub async fn migrate(pool: &PgPool) -> Result<(), InitError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("ledger schema up to date");
    Ok(())
}

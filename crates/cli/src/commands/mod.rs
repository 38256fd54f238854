//! CLI command implementations.

pub mod customers;
pub mod migrate;
pub mod store;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use tradedesk_admin::config::get_database_url;
use tradedesk_admin::db::{RepositoryError, StoreRepository};
use tradedesk_admin::models::Store;

/// Errors shared by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Database URL is not configured.
    #[error("configuration error: {0}")]
    Config(#[from] tradedesk_admin::config::ConfigError),

    /// Database connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// No store with this name.
    #[error("store not found: {0}")]
    StoreNotFound(String),
}

/// Connect to the database named by `TRADEDESK_DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("TRADEDESK_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}

/// Look up a store by its exact name.
pub async fn find_store(pool: &PgPool, name: &str) -> Result<Store, CommandError> {
    StoreRepository::new(pool)
        .find_by_name(name.trim())
        .await?
        .ok_or_else(|| CommandError::StoreNotFound(name.to_owned()))
}

//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tradedesk-cli migrate
//! ```
//!
//! Migrations live in `crates/admin/migrations/` and create the `sales`
//! schema with its tables, including the session table.

use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Could not connect.
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// A migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

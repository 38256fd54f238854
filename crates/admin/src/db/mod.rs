//! Database operations for the `sales` schema.
//!
//! ## Tables
//!
//! - `store` - Business units
//! - `customer` - Customers, unique by `(store_id, code)`
//! - `sales_order` / `order_detail` - Orders and their lines
//! - `delivery` / `delivery_detail` - Deliveries allocating quantities from order lines
//! - `session` - Session storage (tower-sessions)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p tradedesk-cli -- migrate
//! ```
//!
//! Every repository is scoped to one store; a row of another store behaves
//! as if it did not exist.

pub mod customers;
pub mod deliveries;
pub mod orders;
pub mod statistics;
pub mod stores;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tradedesk_core::allocation::AllocationError;
use tradedesk_core::OrderDetailId;

pub use customers::CustomerRepository;
pub use deliveries::DeliveryRepository;
pub use orders::OrderRepository;
pub use statistics::StatisticsRepository;
pub use stores::StoreRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or a change the current data does not allow.
    #[error("{0}")]
    Conflict(String),

    /// A delivery quantity does not fit an order line.
    #[error("order line {detail_id}: {source}")]
    Allocation {
        detail_id: OrderDetailId,
        #[source]
        source: AllocationError,
    },
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict` with `message`.
    pub(crate) fn on_constraint(e: sqlx::Error, constraint: &str, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some(constraint)
        {
            return Self::Conflict(message.to_string());
        }
        Self::Database(e)
    }

    /// Whether the error is something the user can correct.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Allocation { .. })
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(RepositoryError::Conflict("x".to_string()).is_user_error());
        assert!(
            RepositoryError::Allocation {
                detail_id: OrderDetailId::new(4),
                source: AllocationError::NonPositive,
            }
            .is_user_error()
        );
        assert!(!RepositoryError::NotFound.is_user_error());
    }

    #[test]
    fn test_allocation_message_names_the_line() {
        let err = RepositoryError::Allocation {
            detail_id: OrderDetailId::new(12),
            source: AllocationError::ExceedsRemaining {
                remaining: 1,
                requested: 4,
            },
        };
        assert_eq!(
            err.to_string(),
            "order line 12: only 1 left to deliver, 4 requested"
        );
    }
}

//! Database operations for stores.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tradedesk_core::StoreId;

use super::RepositoryError;
use crate::models::{Store, StoreCounts};

const NAME_CONSTRAINT: &str = "store_name_key";
const NAME_TAKEN: &str = "a store with this name already exists";

/// Internal row type for store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::new(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    customers: i64,
    orders: i64,
    open_orders: i64,
    deliveries: i64,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all stores by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, created_at FROM sales.store ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Store::from).collect())
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, created_at FROM sales.store WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    /// Get a store by its exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, created_at FROM sales.store WHERE name = $1",
        )
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Store::from))
    }

    /// Create a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, name: &str) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "INSERT INTO sales.store (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_constraint(e, NAME_CONSTRAINT, NAME_TAKEN))?;

        Ok(row.into())
    }

    /// Rename a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown store and
    /// `RepositoryError::Conflict` if the name is taken.
    pub async fn rename(&self, id: StoreId, name: &str) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "UPDATE sales.store SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id.as_i32())
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_constraint(e, NAME_CONSTRAINT, NAME_TAKEN))?;

        row.map(Store::from).ok_or(RepositoryError::NotFound)
    }

    /// Record counts for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self, id: StoreId) -> Result<StoreCounts, RepositoryError> {
        let row = sqlx::query_as::<_, CountsRow>(
            r"
            SELECT
                (SELECT count(*) FROM sales.customer WHERE store_id = $1) AS customers,
                (SELECT count(*) FROM sales.sales_order WHERE store_id = $1) AS orders,
                (SELECT count(*) FROM sales.sales_order o
                  WHERE o.store_id = $1
                    AND EXISTS (
                        SELECT 1 FROM sales.order_detail od
                        WHERE od.order_id = o.id
                          AND od.quantity > COALESCE(
                              (SELECT sum(dd.quantity) FROM sales.delivery_detail dd
                               WHERE dd.order_detail_id = od.id), 0)
                    )) AS open_orders,
                (SELECT count(*) FROM sales.delivery WHERE store_id = $1) AS deliveries
            ",
        )
        .bind(id.as_i32())
        .fetch_one(self.pool)
        .await?;

        Ok(StoreCounts {
            customers: row.customers,
            orders: row.orders,
            open_orders: row.open_orders,
            deliveries: row.deliveries,
        })
    }
}

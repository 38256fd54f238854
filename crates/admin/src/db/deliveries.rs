//! Database operations for deliveries.
//!
//! Creating a delivery locks every order line it draws from, so two
//! concurrent deliveries cannot both take the last units of a line.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tradedesk_core::allocation;
use tradedesk_core::forms::DeliveryDraft;
use tradedesk_core::{
    CustomerId, DeliveryDetailId, DeliveryId, Money, OrderDetailId, OrderId, StoreId,
};

use super::RepositoryError;
use crate::models::{Delivery, DeliveryDetail, DeliverySummary, OpenOrderDetail};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DeliverySummaryRow {
    id: i32,
    customer_id: i32,
    customer_code: String,
    customer_name: String,
    delivery_date: NaiveDate,
    note: Option<String>,
    line_count: i64,
    total_quantity: i64,
    total_amount: Decimal,
}

impl From<DeliverySummaryRow> for DeliverySummary {
    fn from(row: DeliverySummaryRow) -> Self {
        Self {
            id: DeliveryId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            customer_code: row.customer_code,
            customer_name: row.customer_name,
            delivery_date: row.delivery_date,
            note: row.note,
            line_count: row.line_count,
            total_quantity: row.total_quantity,
            total_amount: Money::new(row.total_amount),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    id: i32,
    customer_id: i32,
    customer_code: String,
    customer_name: String,
    delivery_date: NaiveDate,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryDetailRow {
    id: i32,
    order_detail_id: i32,
    order_id: i32,
    order_date: NaiveDate,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<DeliveryDetailRow> for DeliveryDetail {
    fn from(row: DeliveryDetailRow) -> Self {
        Self {
            id: DeliveryDetailId::new(row.id),
            order_detail_id: OrderDetailId::new(row.order_detail_id),
            order_id: OrderId::new(row.order_id),
            order_date: row.order_date,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OpenDetailRow {
    order_detail_id: i32,
    order_id: i32,
    order_date: NaiveDate,
    product_name: String,
    unit_price: Decimal,
    ordered_quantity: i64,
    delivered_quantity: i64,
}

impl From<OpenDetailRow> for OpenOrderDetail {
    fn from(row: OpenDetailRow) -> Self {
        Self {
            order_detail_id: OrderDetailId::new(row.order_detail_id),
            order_id: OrderId::new(row.order_id),
            order_date: row.order_date,
            product_name: row.product_name,
            unit_price: row.unit_price,
            ordered_quantity: row.ordered_quantity,
            delivered_quantity: row.delivered_quantity,
            remaining_quantity: allocation::remaining(row.ordered_quantity, row.delivered_quantity),
        }
    }
}

/// Locked order line state used while allocating.
#[derive(Debug, sqlx::FromRow)]
struct LockedLineRow {
    id: i32,
    quantity: i32,
    delivered: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for delivery database operations, scoped to one store.
pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
    store_id: StoreId,
}

impl<'a> DeliveryRepository<'a> {
    /// Create a new delivery repository for a store.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store_id: StoreId) -> Self {
        Self { pool, store_id }
    }

    /// List delivery summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<DeliverySummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliverySummaryRow>(
            r"
            SELECT
                d.id, d.customer_id,
                c.code AS customer_code, c.name AS customer_name,
                d.delivery_date, d.note,
                count(dd.id) AS line_count,
                COALESCE(sum(dd.quantity), 0)::BIGINT AS total_quantity,
                COALESCE(sum(od.unit_price * dd.quantity), 0) AS total_amount
            FROM sales.delivery d
            JOIN sales.customer c ON c.id = d.customer_id
            LEFT JOIN sales.delivery_detail dd ON dd.delivery_id = d.id
            LEFT JOIN sales.order_detail od ON od.id = dd.order_detail_id
            WHERE d.store_id = $1
            GROUP BY d.id, c.code, c.name
            ORDER BY d.delivery_date DESC, d.id DESC
            ",
        )
        .bind(self.store_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(DeliverySummary::from).collect())
    }

    /// Get a delivery with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DeliveryId) -> Result<Option<Delivery>, RepositoryError> {
        let header = sqlx::query_as::<_, DeliveryRow>(
            r"
            SELECT d.id, d.customer_id, c.code AS customer_code, c.name AS customer_name,
                   d.delivery_date, d.note, d.created_at
            FROM sales.delivery d
            JOIN sales.customer c ON c.id = d.customer_id
            WHERE d.store_id = $1 AND d.id = $2
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, DeliveryDetailRow>(
            r"
            SELECT dd.id, dd.order_detail_id, od.order_id, o.order_date,
                   od.product_name, od.unit_price, dd.quantity
            FROM sales.delivery_detail dd
            JOIN sales.order_detail od ON od.id = dd.order_detail_id
            JOIN sales.sales_order o ON o.id = od.order_id
            WHERE dd.delivery_id = $1
            ORDER BY o.order_date, od.order_id, od.position
            ",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(Some(Delivery {
            id: DeliveryId::new(header.id),
            customer_id: CustomerId::new(header.customer_id),
            customer_code: header.customer_code,
            customer_name: header.customer_name,
            delivery_date: header.delivery_date,
            note: header.note,
            created_at: header.created_at,
            details: details.into_iter().map(DeliveryDetail::from).collect(),
        }))
    }

    /// Order lines of a customer that still have quantity to deliver,
    /// oldest order first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn open_details(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OpenOrderDetail>, RepositoryError> {
        let rows = sqlx::query_as::<_, OpenDetailRow>(
            r"
            SELECT * FROM (
                SELECT od.id AS order_detail_id, od.order_id, o.order_date,
                       od.product_name, od.unit_price,
                       od.quantity::BIGINT AS ordered_quantity,
                       COALESCE((SELECT sum(dd.quantity) FROM sales.delivery_detail dd
                                 WHERE dd.order_detail_id = od.id), 0)::BIGINT AS delivered_quantity,
                       od.position
                FROM sales.order_detail od
                JOIN sales.sales_order o ON o.id = od.order_id
                WHERE o.store_id = $1 AND o.customer_id = $2
            ) lines
            WHERE delivered_quantity < ordered_quantity
            ORDER BY order_date, order_id, position
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(customer_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OpenOrderDetail::from).collect())
    }

    /// Record a delivery.
    ///
    /// Every allocated order line must belong to an order of the same
    /// customer in this store, and no line may be delivered beyond its
    /// ordered quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for an unknown customer or order
    /// line, and `RepositoryError::Allocation` when a quantity does not fit.
    pub async fn create(&self, draft: &DeliveryDraft) -> Result<DeliveryId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM sales.customer WHERE store_id = $1 AND id = $2",
        )
        .bind(self.store_id.as_i32())
        .bind(draft.customer_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?;
        if customer.is_none() {
            return Err(RepositoryError::Conflict(
                "the selected customer does not exist".to_string(),
            ));
        }

        // Sum repeated lines so the check sees the whole request
        let mut requested: Vec<(OrderDetailId, i64)> = Vec::new();
        for (detail_id, quantity) in &draft.allocations {
            match requested.iter_mut().find(|(id, _)| id == detail_id) {
                Some((_, total)) => *total += i64::from(*quantity),
                None => requested.push((*detail_id, i64::from(*quantity))),
            }
        }
        let ids: Vec<i32> = requested.iter().map(|(id, _)| id.as_i32()).collect();

        // Lock the lines first; aggregates are not allowed with FOR UPDATE
        sqlx::query(
            r"
            SELECT od.id FROM sales.order_detail od
            JOIN sales.sales_order o ON o.id = od.order_id
            WHERE od.id = ANY($1) AND o.store_id = $2 AND o.customer_id = $3
            ORDER BY od.id
            FOR UPDATE OF od
            ",
        )
        .bind(&ids)
        .bind(self.store_id.as_i32())
        .bind(draft.customer_id.as_i32())
        .execute(&mut *tx)
        .await?;

        let locked = sqlx::query_as::<_, LockedLineRow>(
            r"
            SELECT od.id, od.quantity,
                   COALESCE((SELECT sum(dd.quantity) FROM sales.delivery_detail dd
                             WHERE dd.order_detail_id = od.id), 0)::BIGINT AS delivered
            FROM sales.order_detail od
            JOIN sales.sales_order o ON o.id = od.order_id
            WHERE od.id = ANY($1) AND o.store_id = $2 AND o.customer_id = $3
            ",
        )
        .bind(&ids)
        .bind(self.store_id.as_i32())
        .bind(draft.customer_id.as_i32())
        .fetch_all(&mut *tx)
        .await?;
        let lines: HashMap<i32, LockedLineRow> =
            locked.into_iter().map(|row| (row.id, row)).collect();

        for (detail_id, quantity) in &requested {
            let line = lines.get(&detail_id.as_i32()).ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "order line {detail_id} is not an order line of this customer"
                ))
            })?;
            allocation::check(i64::from(line.quantity), line.delivered, *quantity).map_err(
                |source| RepositoryError::Allocation {
                    detail_id: *detail_id,
                    source,
                },
            )?;
        }

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO sales.delivery (store_id, customer_id, delivery_date, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(draft.customer_id.as_i32())
        .bind(draft.delivery_date)
        .bind(draft.note.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for (detail_id, quantity) in &requested {
            let quantity = i32::try_from(*quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!(
                    "order line {detail_id}: quantity {quantity} out of range"
                ))
            })?;
            sqlx::query(
                r"
                INSERT INTO sales.delivery_detail (delivery_id, order_detail_id, quantity)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(id)
            .bind(detail_id.as_i32())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            store_id = %self.store_id,
            delivery_id = id,
            customer_id = %draft.customer_id,
            lines = requested.len(),
            "Delivery recorded"
        );
        Ok(DeliveryId::new(id))
    }

    /// Delete a delivery, freeing its quantities on the order lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown delivery.
    pub async fn delete(&self, id: DeliveryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM sales.delivery WHERE store_id = $1 AND id = $2")
            .bind(self.store_id.as_i32())
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(store_id = %self.store_id, delivery_id = %id, "Delivery deleted");
        Ok(())
    }
}

//! Database operations for orders and order lines.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use tradedesk_core::forms::{OrderDraft, OrderLineDraft};
use tradedesk_core::{CustomerId, Money, OrderDetailId, OrderId, StoreId};

use super::RepositoryError;
use crate::models::{Order, OrderDetail, OrderSummary};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for the order list.
#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    customer_id: i32,
    customer_code: String,
    customer_name: String,
    order_date: NaiveDate,
    note: Option<String>,
    line_count: i64,
    total_amount: Decimal,
    ordered_quantity: i64,
    delivered_quantity: i64,
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            customer_code: row.customer_code,
            customer_name: row.customer_name,
            order_date: row.order_date,
            note: row.note,
            line_count: row.line_count,
            total_amount: Money::new(row.total_amount),
            ordered_quantity: row.ordered_quantity,
            delivered_quantity: row.delivered_quantity,
        }
    }
}

/// Internal row type for an order header.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    customer_code: String,
    customer_name: String,
    order_date: NaiveDate,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for order lines.
#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    id: i32,
    order_id: i32,
    position: i32,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    description: Option<String>,
    delivered_quantity: i64,
}

impl From<OrderDetailRow> for OrderDetail {
    fn from(row: OrderDetailRow) -> Self {
        Self {
            id: OrderDetailId::new(row.id),
            order_id: OrderId::new(row.order_id),
            position: row.position,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
            description: row.description,
            delivered_quantity: row.delivered_quantity,
        }
    }
}

impl OrderRow {
    fn with_details(self, details: Vec<OrderDetailRow>) -> Order {
        Order {
            id: OrderId::new(self.id),
            customer_id: CustomerId::new(self.customer_id),
            customer_code: self.customer_code,
            customer_name: self.customer_name,
            order_date: self.order_date,
            note: self.note,
            created_at: self.created_at,
            updated_at: self.updated_at,
            details: details.into_iter().map(OrderDetail::from).collect(),
        }
    }
}

const SUMMARY_QUERY: &str = r"
    SELECT
        o.id, o.customer_id,
        c.code AS customer_code, c.name AS customer_name,
        o.order_date, o.note,
        count(od.id) AS line_count,
        COALESCE(sum(od.unit_price * od.quantity), 0) AS total_amount,
        COALESCE(sum(od.quantity), 0)::BIGINT AS ordered_quantity,
        COALESCE(sum(dq.delivered), 0)::BIGINT AS delivered_quantity
    FROM sales.sales_order o
    JOIN sales.customer c ON c.id = o.customer_id
    LEFT JOIN sales.order_detail od ON od.order_id = o.id
    LEFT JOIN (
        SELECT order_detail_id, sum(quantity) AS delivered
        FROM sales.delivery_detail
        GROUP BY order_detail_id
    ) dq ON dq.order_detail_id = od.id
    WHERE o.store_id = $1
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations, scoped to one store.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
    store_id: StoreId,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository for a store.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store_id: StoreId) -> Self {
        Self { pool, store_id }
    }

    /// List order summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(&format!(
            "{SUMMARY_QUERY} GROUP BY o.id, c.code, c.name ORDER BY o.order_date DESC, o.id DESC"
        ))
        .bind(self.store_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    /// List order summaries of one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
        limit: i64,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(&format!(
            "{SUMMARY_QUERY} AND o.customer_id = $2 \
             GROUP BY o.id, c.code, c.name ORDER BY o.order_date DESC, o.id DESC LIMIT $3"
        ))
        .bind(self.store_id.as_i32())
        .bind(customer_id.as_i32())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    /// Get an order with its lines and delivered quantities.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let header = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.customer_id, c.code AS customer_code, c.name AS customer_name,
                   o.order_date, o.note, o.created_at, o.updated_at
            FROM sales.sales_order o
            JOIN sales.customer c ON c.id = o.customer_id
            WHERE o.store_id = $1 AND o.id = $2
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, OrderDetailRow>(
            r"
            SELECT od.id, od.order_id, od.position, od.product_name, od.unit_price,
                   od.quantity, od.description,
                   COALESCE((SELECT sum(dd.quantity) FROM sales.delivery_detail dd
                             WHERE dd.order_detail_id = od.id), 0)::BIGINT AS delivered_quantity
            FROM sales.order_detail od
            WHERE od.order_id = $1
            ORDER BY od.position, od.id
            ",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(Some(header.with_details(details)))
    }

    /// Create an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer does not belong to
    /// the store.
    pub async fn create(&self, draft: &OrderDraft) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.ensure_customer(&mut tx, draft.customer_id).await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO sales.sales_order (store_id, customer_id, order_date, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(draft.customer_id.as_i32())
        .bind(draft.order_date)
        .bind(draft.note.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        insert_details(&mut tx, id, &draft.lines).await?;
        tx.commit().await?;

        tracing::info!(
            store_id = %self.store_id,
            order_id = id,
            lines = draft.lines.len(),
            "Order created"
        );
        Ok(OrderId::new(id))
    }

    /// Update an order header and replace its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any line already has
    /// deliveries, and `RepositoryError::NotFound` for an unknown order.
    pub async fn update(&self, id: OrderId, draft: &OrderDraft) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.lock_order(&mut tx, id).await?;

        if delivered_lines(&mut tx, id).await? > 0 {
            return Err(RepositoryError::Conflict(
                "this order already has deliveries; delete them before editing the order"
                    .to_string(),
            ));
        }
        self.ensure_customer(&mut tx, draft.customer_id).await?;

        sqlx::query(
            r"
            UPDATE sales.sales_order
            SET customer_id = $3, order_date = $4, note = $5, updated_at = now()
            WHERE store_id = $1 AND id = $2
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .bind(draft.customer_id.as_i32())
        .bind(draft.order_date)
        .bind(draft.note.as_deref())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sales.order_detail WHERE order_id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;
        insert_details(&mut tx, id.as_i32(), &draft.lines).await?;

        tx.commit().await?;
        tracing::info!(store_id = %self.store_id, order_id = %id, "Order updated");
        Ok(())
    }

    /// Delete an order and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any line has deliveries.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        self.lock_order(&mut tx, id).await?;

        if delivered_lines(&mut tx, id).await? > 0 {
            return Err(RepositoryError::Conflict(
                "this order already has deliveries and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM sales.sales_order WHERE store_id = $1 AND id = $2")
            .bind(self.store_id.as_i32())
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(store_id = %self.store_id, order_id = %id, "Order deleted");
        Ok(())
    }

    async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: OrderId,
    ) -> Result<(), RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT id FROM sales.sales_order WHERE store_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .fetch_optional(&mut **tx)
        .await?
        .map(|_| ())
        .ok_or(RepositoryError::NotFound)
    }

    async fn ensure_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer_id: CustomerId,
    ) -> Result<(), RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT id FROM sales.customer WHERE store_id = $1 AND id = $2",
        )
        .bind(self.store_id.as_i32())
        .bind(customer_id.as_i32())
        .fetch_optional(&mut **tx)
        .await?
        .map(|_| ())
        .ok_or_else(|| RepositoryError::Conflict("the selected customer does not exist".to_string()))
    }
}

async fn delivered_lines(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar(
        r"
        SELECT count(*) FROM sales.delivery_detail dd
        JOIN sales.order_detail od ON od.id = dd.order_detail_id
        WHERE od.order_id = $1
        ",
    )
    .bind(id.as_i32())
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

async fn insert_details(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i32,
    lines: &[OrderLineDraft],
) -> Result<(), RepositoryError> {
    for (position, line) in (1_i32..).zip(lines) {
        sqlx::query(
            r"
            INSERT INTO sales.order_detail
                (order_id, position, product_name, unit_price, quantity, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(order_id)
        .bind(position)
        .bind(&line.product_name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.description.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

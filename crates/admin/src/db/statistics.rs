//! Aggregated sales figures per customer.

use rust_decimal::Decimal;
use sqlx::PgPool;

use tradedesk_core::{CustomerId, Money, StoreId};

use super::RepositoryError;
use crate::models::{CustomerStatistics, DateRange};

#[derive(Debug, sqlx::FromRow)]
struct StatisticsRow {
    customer_id: i32,
    customer_code: String,
    customer_name: String,
    order_count: i64,
    ordered_quantity: i64,
    delivered_quantity: i64,
    sales_amount: Decimal,
    delivered_amount: Decimal,
    average_lead_days: Option<Decimal>,
}

impl From<StatisticsRow> for CustomerStatistics {
    fn from(row: StatisticsRow) -> Self {
        Self {
            customer_id: CustomerId::new(row.customer_id),
            customer_code: row.customer_code,
            customer_name: row.customer_name,
            order_count: row.order_count,
            ordered_quantity: row.ordered_quantity,
            delivered_quantity: row.delivered_quantity,
            sales_amount: Money::new(row.sales_amount),
            delivered_amount: Money::new(row.delivered_amount),
            average_lead_days: row.average_lead_days,
        }
    }
}

/// Repository for statistics queries, scoped to one store.
pub struct StatisticsRepository<'a> {
    pool: &'a PgPool,
    store_id: StoreId,
}

impl<'a> StatisticsRepository<'a> {
    /// Create a new statistics repository for a store.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store_id: StoreId) -> Self {
        Self { pool, store_id }
    }

    /// One row per customer with at least one order dated inside `range`.
    ///
    /// Delivered figures and lead time count deliveries made against those
    /// orders, whatever the delivery date. Lead time is the mean of
    /// `delivery_date - order_date` over delivery lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn per_customer(
        &self,
        range: DateRange,
    ) -> Result<Vec<CustomerStatistics>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatisticsRow>(
            r"
            WITH lines AS (
                SELECT o.customer_id, o.id AS order_id, o.order_date,
                       od.id AS detail_id, od.quantity, od.unit_price
                FROM sales.sales_order o
                JOIN sales.order_detail od ON od.order_id = o.id
                WHERE o.store_id = $1 AND o.order_date BETWEEN $2 AND $3
            ),
            ordered AS (
                SELECT customer_id,
                       count(DISTINCT order_id) AS order_count,
                       sum(quantity)::BIGINT AS ordered_quantity,
                       sum(unit_price * quantity) AS sales_amount
                FROM lines
                GROUP BY customer_id
            ),
            delivered AS (
                SELECT l.customer_id,
                       sum(dd.quantity)::BIGINT AS delivered_quantity,
                       sum(l.unit_price * dd.quantity) AS delivered_amount,
                       avg(d.delivery_date - l.order_date)::NUMERIC AS average_lead_days
                FROM lines l
                JOIN sales.delivery_detail dd ON dd.order_detail_id = l.detail_id
                JOIN sales.delivery d ON d.id = dd.delivery_id
                GROUP BY l.customer_id
            )
            SELECT c.id AS customer_id, c.code AS customer_code, c.name AS customer_name,
                   o.order_count, o.ordered_quantity,
                   COALESCE(dl.delivered_quantity, 0)::BIGINT AS delivered_quantity,
                   o.sales_amount,
                   COALESCE(dl.delivered_amount, 0) AS delivered_amount,
                   dl.average_lead_days
            FROM ordered o
            JOIN sales.customer c ON c.id = o.customer_id
            LEFT JOIN delivered dl ON dl.customer_id = o.customer_id
            ORDER BY c.code
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(self.pool)
        .await?;

        tracing::debug!(
            store_id = %self.store_id,
            from = %range.from,
            to = %range.to,
            customers = rows.len(),
            "Statistics computed"
        );
        Ok(rows.into_iter().map(CustomerStatistics::from).collect())
    }
}

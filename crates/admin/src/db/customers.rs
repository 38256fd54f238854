//! Database operations for customers.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tradedesk_core::forms::CustomerDraft;
use tradedesk_core::{CustomerCode, CustomerId, PhoneNumber, StoreId};

use super::RepositoryError;
use crate::models::{Customer, ImportOutcome};

const CODE_CONSTRAINT: &str = "customer_store_code_key";
const CODE_TAKEN: &str = "a customer with this ID already exists in this store";

/// Most entries returned by the customer picker.
pub const SEARCH_LIMIT: i64 = 20;

const CUSTOMER_COLUMNS: &str = "id, store_id, code, name, contact_person, address, phone, \
                                delivery_condition, note, created_at, updated_at";

/// Internal row type for customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    store_id: i32,
    code: String,
    name: String,
    contact_person: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    delivery_condition: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let code = CustomerCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("customer {} code: {e}", row.id))
        })?;
        let phone = row
            .phone
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("customer {} phone: {e}", row.id))
            })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            store_id: StoreId::new(row.store_id),
            code,
            name: row.name,
            contact_person: row.contact_person,
            address: row.address,
            phone,
            delivery_condition: row.delivery_condition,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_customers(rows: Vec<CustomerRow>) -> Result<Vec<Customer>, RepositoryError> {
    rows.into_iter().map(Customer::try_from).collect()
}

/// Escape `LIKE` wildcards in user input.
fn like_prefix(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 1);
    for c in input.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for customer database operations, scoped to one store.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
    store_id: StoreId,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository for a store.
    #[must_use]
    pub const fn new(pool: &'a PgPool, store_id: StoreId) -> Self {
        Self { pool, store_id }
    }

    /// List every customer of the store, by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM sales.customer WHERE store_id = $1 ORDER BY code"
        ))
        .bind(self.store_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        into_customers(rows)
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM sales.customer WHERE store_id = $1 AND id = $2"
        ))
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Search by code or name prefix for the customer picker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Customer>, RepositoryError> {
        let pattern = like_prefix(query);
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS} FROM sales.customer
            WHERE store_id = $1 AND (code ILIKE $2 OR name ILIKE $2)
            ORDER BY code
            LIMIT $3
            "
        ))
        .bind(self.store_id.as_i32())
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;

        into_customers(rows)
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already used in
    /// this store.
    pub async fn create(&self, draft: &CustomerDraft) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            INSERT INTO sales.customer (
                store_id, code, name, contact_person, address, phone,
                delivery_condition, note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(self.store_id.as_i32())
        .bind(draft.code.as_str())
        .bind(&draft.name)
        .bind(draft.contact_person.as_deref())
        .bind(draft.address.as_deref())
        .bind(draft.phone.as_ref().map(PhoneNumber::as_str))
        .bind(draft.delivery_condition.as_deref())
        .bind(draft.note.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_constraint(e, CODE_CONSTRAINT, CODE_TAKEN))?;

        row.try_into()
    }

    /// Update a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist in
    /// this store and `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            UPDATE sales.customer SET
                code = $3, name = $4, contact_person = $5, address = $6, phone = $7,
                delivery_condition = $8, note = $9, updated_at = now()
            WHERE store_id = $1 AND id = $2
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .bind(draft.code.as_str())
        .bind(&draft.name)
        .bind(draft.contact_person.as_deref())
        .bind(draft.address.as_deref())
        .bind(draft.phone.as_ref().map(PhoneNumber::as_str))
        .bind(draft.delivery_condition.as_deref())
        .bind(draft.note.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::on_constraint(e, CODE_CONSTRAINT, CODE_TAKEN))?;

        row.map(Customer::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer has orders or
    /// deliveries, and `RepositoryError::NotFound` if it does not exist.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (orders, deliveries): (i64, i64) = sqlx::query_as(
            r"
            SELECT
                (SELECT count(*) FROM sales.sales_order WHERE store_id = $1 AND customer_id = $2),
                (SELECT count(*) FROM sales.delivery WHERE store_id = $1 AND customer_id = $2)
            ",
        )
        .bind(self.store_id.as_i32())
        .bind(id.as_i32())
        .fetch_one(&mut *tx)
        .await?;

        if orders > 0 || deliveries > 0 {
            return Err(RepositoryError::Conflict(format!(
                "this customer has {orders} order(s) and {deliveries} delivery(ies) and cannot be deleted"
            )));
        }

        let result = sqlx::query("DELETE FROM sales.customer WHERE store_id = $1 AND id = $2")
            .bind(self.store_id.as_i32())
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or update customers by code in one transaction.
    ///
    /// Either every draft is written or none is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn upsert_many(
        &self,
        drafts: &[CustomerDraft],
    ) -> Result<ImportOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ImportOutcome::default();

        for draft in drafts {
            // xmax = 0 only for freshly inserted rows
            let inserted: bool = sqlx::query_scalar(
                r"
                INSERT INTO sales.customer (
                    store_id, code, name, contact_person, address, phone,
                    delivery_condition, note
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT ON CONSTRAINT customer_store_code_key DO UPDATE SET
                    name = EXCLUDED.name,
                    contact_person = EXCLUDED.contact_person,
                    address = EXCLUDED.address,
                    phone = EXCLUDED.phone,
                    delivery_condition = EXCLUDED.delivery_condition,
                    note = EXCLUDED.note,
                    updated_at = now()
                RETURNING (xmax = 0)
                ",
            )
            .bind(self.store_id.as_i32())
            .bind(draft.code.as_str())
            .bind(&draft.name)
            .bind(draft.contact_person.as_deref())
            .bind(draft.address.as_deref())
            .bind(draft.phone.as_ref().map(PhoneNumber::as_str))
            .bind(draft.delivery_condition.as_deref())
            .bind(draft.note.as_deref())
            .fetch_one(&mut *tx)
            .await?;

            if inserted {
                outcome.created += 1;
            } else {
                outcome.updated += 1;
            }
        }

        tx.commit().await?;
        tracing::info!(
            store_id = %self.store_id,
            created = outcome.created,
            updated = outcome.updated,
            "Customers imported"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix(" C-0 "), "C-0%");
        assert_eq!(like_prefix("50%_off"), "50\\%\\_off%");
        assert_eq!(like_prefix(""), "%");
    }
}

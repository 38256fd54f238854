//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradedesk_core::StoreId;

use super::CurrentStore;

/// A business unit. Customers, orders and deliveries belong to one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Store> for CurrentStore {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
        }
    }
}

/// Record counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub customers: i64,
    pub orders: i64,
    pub open_orders: i64,
    pub deliveries: i64,
}

//! Session-stored state.

use serde::{Deserialize, Serialize};

use tradedesk_core::StoreId;

/// The store selected for this browser session.
///
/// Every store-scoped page reads it; see
/// [`RequireStore`](crate::middleware::RequireStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStore {
    /// Store database ID.
    pub id: StoreId,
    /// Store name, shown in the header and checked against CSV rows.
    pub name: String,
}

/// Session keys.
pub mod keys {
    /// Key for the selected store.
    pub const CURRENT_STORE: &str = "current_store";

    /// Key for a one-shot notice shown on the next page.
    pub const FLASH: &str = "flash";
}

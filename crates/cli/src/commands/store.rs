//! Store management commands.

use tradedesk_admin::db::StoreRepository;
use tradedesk_admin::models::Store;

use super::{CommandError, connect, find_store};

/// List every store.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let stores = StoreRepository::new(&pool).list().await?;

    if stores.is_empty() {
        tracing::info!("No stores yet");
    }
    for store in &stores {
        tracing::info!(store_id = %store.id, created_at = %store.created_at, "{}", store.name);
    }
    Ok(())
}

/// Create a store.
///
/// Returns the created store.
pub async fn create(name: &str) -> Result<Store, CommandError> {
    let pool = connect().await?;
    let store = StoreRepository::new(&pool).create(name.trim()).await?;

    tracing::info!(store_id = %store.id, "Store created: {}", store.name);
    Ok(store)
}

/// Rename a store.
pub async fn rename(name: &str, new_name: &str) -> Result<Store, CommandError> {
    let pool = connect().await?;
    let store = find_store(&pool, name).await?;
    let renamed = StoreRepository::new(&pool)
        .rename(store.id, new_name.trim())
        .await?;

    tracing::info!(store_id = %renamed.id, "Store renamed: {} -> {}", name, renamed.name);
    Ok(renamed)
}

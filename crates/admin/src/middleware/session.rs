//! Session middleware configuration for admin.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session
//! carries the selected store and a one-shot flash notice.

use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "tradedesk_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - Admin configuration (for determining HTTPS mode)
///
/// # Panics
///
/// Panics if the schema name or table name is invalid (should never happen
/// with hardcoded "sales" and "session" values).
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> SessionManagerLayer<PostgresStore> {
    // The session table is created by migration in the sales schema.
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("sales")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name");

    configure_session_layer(store, config)
}

/// Apply cookie settings to a session layer over any store.
///
/// Tests pass `tower_sessions::MemoryStore` here.
#[must_use]
pub fn configure_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &AdminConfig,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        // Lax so links from other tools keep the selected store
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Store a notice for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_flash(
    session: &Session,
    message: impl Into<String> + Send,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, message.into()).await
}

/// Take the pending notice, if any. Store errors read as no notice.
pub async fn take_flash(session: &Session) -> Option<String> {
    session
        .remove::<String>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

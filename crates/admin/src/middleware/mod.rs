//! HTTP middleware for admin.
//!
//! # Layer Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Store selection is enforced per handler with the [`RequireStore`]
//! extractor rather than a layer, so health checks and the store picker stay
//! reachable.

pub mod session;
pub mod store;

pub use session::{
    SESSION_COOKIE_NAME, configure_session_layer, create_session_layer, set_flash, take_flash,
};
pub use store::{
    OptionalStore, RequireStore, StoreCheck, StoreRejection, clear_current_store, set_current_store,
};

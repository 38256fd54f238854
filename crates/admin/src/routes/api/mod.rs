//! JSON API route handlers for admin.
//!
//! Small endpoints used by the forms. They require a selected store like
//! the pages do, but answer 401 instead of redirecting.

pub mod customers;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new().merge(customers::router())
}

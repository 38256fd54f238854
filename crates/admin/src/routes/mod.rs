//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database)
//!
//! # Store selection (no store required)
//! GET  /stores/select                 - Store picker
//! POST /stores/select                 - Select a store
//! POST /stores                        - Create a store and select it
//!
//! # Dashboard
//! GET  /                              - Counts for the selected store
//!
//! # Customers
//! GET  /customers                     - List (q/sort/order/page)
//! GET  /customers/new                 - New form
//! POST /customers                     - Create
//! GET  /customers/import              - Upload form
//! POST /customers/import              - Import a Shift_JIS CSV (multipart)
//! GET  /customers/export              - Download a Shift_JIS CSV
//! GET  /customers/{id}                - Detail with recent orders
//! GET  /customers/{id}/edit           - Edit form
//! POST /customers/{id}                - Update
//! POST /customers/{id}/delete         - Delete
//!
//! # Orders
//! GET  /orders                        - List
//! GET  /orders/new                    - New form
//! POST /orders                        - Create
//! GET  /orders/{id}                   - Detail with delivery progress
//! GET  /orders/{id}/edit              - Edit form
//! POST /orders/{id}                   - Update
//! POST /orders/{id}/delete            - Delete
//!
//! # Deliveries
//! GET  /deliveries                    - List
//! GET  /deliveries/new?customer_id=   - Allocation form
//! POST /deliveries                    - Create
//! GET  /deliveries/{id}               - Detail
//! POST /deliveries/{id}/delete        - Delete
//!
//! # Statistics
//! GET  /statistics                    - Per-customer figures (from/to)
//! GET  /statistics/export             - Download as Shift_JIS CSV
//!
//! # JSON
//! GET  /api/customers?q=              - Customer picker
//! GET  /api/customers/{id}/open-details - Undelivered order lines
//! ```

pub mod api;
pub mod customers;
pub mod dashboard;
pub mod deliveries;
pub mod health;
pub mod orders;
pub mod statistics;
pub mod stores;

use askama::Template;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::take_flash;
use crate::models::{CurrentStore, CustomerOption};
use crate::state::AppState;

/// Room for multipart framing on top of the CSV itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Page chrome shared by every template.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Selected store, shown in the header.
    pub store_name: Option<String>,
    /// Path of the active navigation entry.
    pub current_path: &'static str,
    /// One-shot notice from the previous request.
    pub flash: Option<String>,
}

impl Layout {
    /// Layout for a store-scoped page, consuming the pending flash notice.
    pub async fn for_store(
        session: &Session,
        store: &CurrentStore,
        current_path: &'static str,
    ) -> Self {
        Self {
            store_name: Some(store.name.clone()),
            current_path,
            flash: take_flash(session).await,
        }
    }

    /// Whether `path` is the active navigation entry.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        self.current_path == path
    }
}

/// A customer entry of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerChoice {
    pub id: i32,
    pub label: String,
    pub selected: bool,
}

impl CustomerChoice {
    /// Options for a customer picker, marking the raw `selected` form value.
    #[must_use]
    pub fn list(options: &[CustomerOption], selected: &str) -> Vec<Self> {
        let selected = selected.trim();
        options
            .iter()
            .map(|option| Self {
                id: option.id.as_i32(),
                label: format!("{} {}", option.code, option.name),
                selected: option.id.to_string() == selected,
            })
            .collect()
    }
}

/// Render a template, logging failures.
pub fn render<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// A Shift_JIS CSV download.
pub fn csv_download(filename: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!(
        "attachment; filename=\"{filename}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=Shift_JIS"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Build the application routes (without session or tracing layers).
pub fn routes(import_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Store selection
        .route("/stores/select", get(stores::select_page).post(stores::select))
        .route("/stores", post(stores::create))
        // Dashboard
        .route("/", get(dashboard::index))
        // Customers
        .route("/customers", get(customers::index).post(customers::create))
        .route("/customers/new", get(customers::new_customer))
        .route(
            "/customers/import",
            get(customers::import_page)
                .post(customers::import)
                .layer(DefaultBodyLimit::max(import_max_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/customers/export", get(customers::export))
        .route("/customers/{id}", get(customers::show).post(customers::update))
        .route("/customers/{id}/edit", get(customers::edit))
        .route("/customers/{id}/delete", post(customers::delete))
        // Orders
        .route("/orders", get(orders::index).post(orders::create))
        .route("/orders/new", get(orders::new_order))
        .route("/orders/{id}", get(orders::show).post(orders::update))
        .route("/orders/{id}/edit", get(orders::edit))
        .route("/orders/{id}/delete", post(orders::delete))
        // Deliveries
        .route("/deliveries", get(deliveries::index).post(deliveries::create))
        .route("/deliveries/new", get(deliveries::new_delivery))
        .route("/deliveries/{id}", get(deliveries::show))
        .route("/deliveries/{id}/delete", post(deliveries::delete))
        // Statistics
        .route("/statistics", get(statistics::index))
        .route("/statistics/export", get(statistics::export))
        // JSON
        .merge(api::router())
}

/// Build the router with state applied.
///
/// Callers add the session layer; every store-scoped handler needs it.
pub fn router(state: AppState) -> Router {
    let import_max_bytes = state.config().import_max_bytes;
    routes(import_max_bytes).with_state(state)
}

#[cfg(test)]
mod tests {
    use tradedesk_core::CustomerId;

    use super::*;

    #[test]
    fn test_customer_choices_mark_selection() {
        let options = vec![
            CustomerOption {
                id: CustomerId::new(1),
                code: "C-1".to_string(),
                name: "Sato".to_string(),
            },
            CustomerOption {
                id: CustomerId::new(2),
                code: "C-2".to_string(),
                name: "Ito".to_string(),
            },
        ];
        let choices = CustomerChoice::list(&options, " 2 ");
        assert_eq!(choices.len(), 2);
        assert!(!choices.first().is_some_and(|c| c.selected));
        assert!(choices.last().is_some_and(|c| c.selected));
        assert_eq!(choices.first().map(|c| c.label.as_str()), Some("C-1 Sato"));
    }

    #[test]
    fn test_csv_download_headers() {
        let response = csv_download("statistics.csv", vec![0x82, 0xa0]);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=Shift_JIS")
        );
        assert!(
            headers
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("attachment; filename=\"statistics.csv\""))
        );
    }
}

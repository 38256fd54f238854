//! Customer API handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use tradedesk_core::CustomerId;

use crate::{
    db::{CustomerRepository, DeliveryRepository},
    middleware::RequireStore,
    models::{CustomerOption, OpenOrderDetail},
    state::AppState,
};

/// Build the customers API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(search_customers))
        .route("/api/customers/{id}/open-details", get(open_details))
}

/// Query for the customer picker.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Customers of the selected store whose code or name starts with `q`.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(store, state), fields(store_id = %store.id))]
pub async fn search_customers(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<CustomerOption>>, StatusCode> {
    match CustomerRepository::new(state.pool(), store.id)
        .search(&query.q)
        .await
    {
        Ok(customers) => Ok(Json(customers.iter().map(CustomerOption::from).collect())),
        Err(e) => {
            tracing::error!("Failed to search customers: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Undelivered order lines of a customer, oldest order first.
///
/// # Errors
///
/// Returns 404 for a customer outside the selected store and 500 if a
/// database query fails.
#[instrument(skip(store, state), fields(store_id = %store.id))]
pub async fn open_details(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<OpenOrderDetail>>, StatusCode> {
    let customer_id = CustomerId::new(id);
    let customer = CustomerRepository::new(state.pool(), store.id)
        .get(customer_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load customer: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if customer.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    DeliveryRepository::new(state.pool(), store.id)
        .open_details(customer_id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to load open order lines: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

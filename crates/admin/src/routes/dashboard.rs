//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    db::{OrderRepository, StoreRepository},
    error::AppError,
    filters,
    middleware::RequireStore,
    models::{OrderSummary, StoreCounts},
    state::AppState,
};

use super::Layout;

/// Orders shown under "Recent orders".
const RECENT_ORDERS: usize = 5;

/// Recent order view for dashboard.
#[derive(Debug, Clone)]
pub struct RecentOrderView {
    pub id: i32,
    pub order_date: String,
    pub customer_name: String,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&OrderSummary> for RecentOrderView {
    fn from(order: &OrderSummary) -> Self {
        let progress = order.progress();
        Self {
            id: order.id.as_i32(),
            order_date: order.order_date.to_string(),
            customer_name: order.customer_name.clone(),
            total: order.total_amount.to_string(),
            status: progress.label(),
            status_class: progress.badge_class(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub counts: StoreCounts,
    pub recent_orders: Vec<RecentOrderView>,
}

/// Dashboard page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn index(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
) -> Result<DashboardTemplate, AppError> {
    let counts = StoreRepository::new(state.pool()).counts(store.id).await?;
    let orders = OrderRepository::new(state.pool(), store.id).list().await?;

    let template = DashboardTemplate {
        layout: Layout::for_store(&session, &store, "/").await,
        counts,
        recent_orders: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(RecentOrderView::from)
            .collect(),
    };

    Ok(template)
}

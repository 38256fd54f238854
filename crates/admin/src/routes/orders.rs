//! Order route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use tradedesk_core::{Money, OrderId};
use tradedesk_core::forms::{FieldErrors, OrderForm, OrderLineForm};
use tradedesk_core::listing::ListQuery;

use crate::{
    components::{DataTable, data_table::orders_table_config},
    db::{CustomerRepository, OrderRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::{RequireStore, set_flash},
    models::{CurrentStore, CustomerOption, Order, OrderDetail, OrderSummary},
    state::AppState,
};

use super::{CustomerChoice, Layout, render};

/// Line rows the order form always offers.
pub const MIN_FORM_LINES: usize = 5;

/// Blank line rows added below the filled ones.
const EXTRA_FORM_LINES: usize = 2;

/// Order row view for the list.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: i32,
    pub order_date: String,
    pub customer_code: String,
    pub customer_name: String,
    pub line_count: i64,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&OrderSummary> for OrderRowView {
    fn from(order: &OrderSummary) -> Self {
        let progress = order.progress();
        Self {
            id: order.id.as_i32(),
            order_date: order.order_date.to_string(),
            customer_code: order.customer_code.clone(),
            customer_name: order.customer_name.clone(),
            line_count: order.line_count,
            total: order.total_amount.to_string(),
            status: progress.label(),
            status_class: progress.badge_class(),
        }
    }
}

/// Order line view for the detail page.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub position: i32,
    pub product_name: String,
    pub description: String,
    pub unit_price: String,
    pub quantity: i32,
    pub line_total: String,
    pub delivered: i64,
    pub remaining: i64,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&OrderDetail> for OrderLineView {
    fn from(detail: &OrderDetail) -> Self {
        let progress = detail.progress();
        Self {
            position: detail.position,
            product_name: detail.product_name.clone(),
            description: detail.description.clone().unwrap_or_default(),
            unit_price: Money::new(detail.unit_price).to_string(),
            quantity: detail.quantity,
            line_total: detail.line_total().to_string(),
            delivered: detail.delivered_quantity,
            remaining: detail.remaining(),
            status: progress.label(),
            status_class: progress.badge_class(),
        }
    }
}

/// Orders list page template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub table: DataTable<OrderRowView>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub id: i32,
    pub customer_id: i32,
    pub customer_code: String,
    pub customer_name: String,
    pub order_date: String,
    pub note: String,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
    /// Orders with deliveries can no longer be edited or deleted.
    pub locked: bool,
    pub has_remaining: bool,
    pub lines: Vec<OrderLineView>,
}

impl From<&Order> for OrderShowTemplate {
    fn from(order: &Order) -> Self {
        let progress = order.progress();
        let lines: Vec<OrderLineView> = order.details.iter().map(OrderLineView::from).collect();
        Self {
            layout: Layout::default(),
            id: order.id.as_i32(),
            customer_id: order.customer_id.as_i32(),
            customer_code: order.customer_code.clone(),
            customer_name: order.customer_name.clone(),
            order_date: order.order_date.to_string(),
            note: order.note.clone().unwrap_or_default(),
            total: order.total_amount().to_string(),
            status: progress.label(),
            status_class: progress.badge_class(),
            locked: order.has_deliveries(),
            has_remaining: lines.iter().any(|l| l.remaining > 0),
            lines,
        }
    }
}

/// Order create/edit form template.
#[derive(Template)]
#[template(path = "orders/form.html")]
pub struct OrderFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    pub cancel_href: String,
    pub customers: Vec<CustomerChoice>,
    pub order_date: String,
    pub note: String,
    /// Line rows to render, padded with blank rows.
    pub lines: Vec<OrderLineForm>,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

impl OrderFormTemplate {
    /// Message for one field, empty when the field is fine.
    #[must_use]
    pub fn field_error(&self, field: &str) -> String {
        self.errors.get(field).unwrap_or_default().to_string()
    }
}

/// Query parameters for the new order form.
#[derive(Debug, Default, Deserialize)]
pub struct NewOrderQuery {
    pub customer_id: Option<String>,
}

/// Form lines padded with blank rows for new input.
fn padded_lines(lines: &[OrderLineForm]) -> Vec<OrderLineForm> {
    let target = (lines.len() + EXTRA_FORM_LINES).max(MIN_FORM_LINES);
    let mut padded = lines.to_vec();
    padded.resize_with(target, OrderLineForm::default);
    padded
}

async fn form_page(
    state: &AppState,
    session: &Session,
    store: &CurrentStore,
    editing: Option<i32>,
    form: &OrderForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Result<OrderFormTemplate, AppError> {
    let customers = CustomerRepository::new(state.pool(), store.id)
        .list()
        .await?;
    let options: Vec<CustomerOption> = customers.iter().map(CustomerOption::from).collect();

    let (title, action, cancel_href) = match editing {
        Some(id) => (
            format!("Edit order #{id}"),
            format!("/orders/{id}"),
            format!("/orders/{id}"),
        ),
        None => (
            "New order".to_string(),
            "/orders".to_string(),
            "/orders".to_string(),
        ),
    };

    Ok(OrderFormTemplate {
        layout: Layout::for_store(session, store, "/orders").await,
        title,
        action,
        cancel_href,
        customers: CustomerChoice::list(&options, &form.customer_id),
        order_date: form.order_date.clone(),
        note: form.note.clone(),
        lines: padded_lines(&form.lines),
        errors,
        error,
    })
}

fn rejected(template: &OrderFormTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, render(template)).into_response()
}

async fn load_order(repo: &OrderRepository<'_>, id: i32) -> Result<Order, AppError> {
    repo.get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Orders list page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn index(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let orders = OrderRepository::new(state.pool(), store.id).list().await?;
    let listing = query.apply(orders, state.config().page_size);

    let template = OrdersIndexTemplate {
        layout: Layout::for_store(&session, &store, "/orders").await,
        table: orders_table_config().build(&query, &listing, |row| OrderRowView::from(row)),
    };

    Ok(render(&template))
}

/// Order detail page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn show(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<OrderShowTemplate, AppError> {
    let order = load_order(&OrderRepository::new(state.pool(), store.id), id).await?;

    let mut template = OrderShowTemplate::from(&order);
    template.layout = Layout::for_store(&session, &store, "/orders").await;

    Ok(template)
}

/// New order form handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn new_order(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NewOrderQuery>,
) -> Result<Html<String>, AppError> {
    let form = OrderForm {
        customer_id: query.customer_id.unwrap_or_default(),
        order_date: chrono::Local::now().date_naive().to_string(),
        ..OrderForm::default()
    };
    let template =
        form_page(&state, &session, &store, None, &form, FieldErrors::new(), None).await?;
    Ok(render(&template))
}

/// Create order handler.
#[instrument(skip(store, state, session, pairs), fields(store_id = %store.id))]
pub async fn create(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = OrderForm::from_pairs(&pairs);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            let template = form_page(&state, &session, &store, None, &form, errors, None).await?;
            return Ok(rejected(&template));
        }
    };

    match OrderRepository::new(state.pool(), store.id)
        .create(&draft)
        .await
    {
        Ok(id) => {
            set_flash(&session, format!("Order #{id} created")).await?;
            Ok(Redirect::to(&format!("/orders/{id}")).into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let template = form_page(
                &state,
                &session,
                &store,
                None,
                &form,
                FieldErrors::new(),
                Some(message),
            )
            .await?;
            Ok(rejected(&template))
        }
        Err(e) => Err(e.into()),
    }
}

/// Edit order form handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn edit(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let order = load_order(&OrderRepository::new(state.pool(), store.id), id).await?;
    if order.has_deliveries() {
        set_flash(&session, "Orders with deliveries cannot be edited").await?;
        return Ok(Redirect::to(&format!("/orders/{id}")).into_response());
    }

    let template = form_page(
        &state,
        &session,
        &store,
        Some(id),
        &order.to_form(),
        FieldErrors::new(),
        None,
    )
    .await?;
    Ok(render(&template).into_response())
}

/// Update order handler. Replaces the header and every line.
#[instrument(skip(store, state, session, pairs), fields(store_id = %store.id))]
pub async fn update(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = OrderForm::from_pairs(&pairs);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            let template =
                form_page(&state, &session, &store, Some(id), &form, errors, None).await?;
            return Ok(rejected(&template));
        }
    };

    match OrderRepository::new(state.pool(), store.id)
        .update(OrderId::new(id), &draft)
        .await
    {
        Ok(()) => {
            set_flash(&session, format!("Order #{id} saved")).await?;
            Ok(Redirect::to(&format!("/orders/{id}")).into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            let template = form_page(
                &state,
                &session,
                &store,
                Some(id),
                &form,
                FieldErrors::new(),
                Some(message),
            )
            .await?;
            Ok(rejected(&template))
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("order {id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Delete order handler. Delivered orders are kept.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn delete(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match OrderRepository::new(state.pool(), store.id)
        .delete(OrderId::new(id))
        .await
    {
        Ok(()) => {
            set_flash(&session, format!("Order #{id} deleted")).await?;
            Ok(Redirect::to("/orders").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            tracing::warn!(order_id = id, reason = %message, "Order delete refused");
            set_flash(&session, message).await?;
            Ok(Redirect::to(&format!("/orders/{id}")).into_response())
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("order {id}"))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use rust_decimal::Decimal;
    use tradedesk_core::{CustomerId, OrderDetailId};

    use super::*;

    fn line(name: &str) -> OrderLineForm {
        OrderLineForm {
            product_name: name.to_string(),
            ..OrderLineForm::default()
        }
    }

    #[test]
    fn test_form_offers_minimum_lines() {
        let lines = padded_lines(&[line("Rice")]);
        assert_eq!(lines.len(), MIN_FORM_LINES);
        assert_eq!(lines.first().map(|l| l.product_name.as_str()), Some("Rice"));
    }

    #[test]
    fn test_form_adds_blank_lines_below_long_orders() {
        let filled: Vec<_> = (0..6).map(|i| line(&format!("item {i}"))).collect();
        let lines = padded_lines(&filled);
        assert_eq!(lines.len(), 6 + EXTRA_FORM_LINES);
        assert!(lines.last().is_some_and(|l| l.product_name.is_empty()));
    }

    #[test]
    fn test_show_view_locks_delivered_orders() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let detail = |id: i32, quantity: i32, delivered: i64| OrderDetail {
            id: OrderDetailId::new(id),
            order_id: OrderId::new(9),
            position: id,
            product_name: "Tea".to_string(),
            unit_price: Decimal::from(250),
            quantity,
            description: None,
            delivered_quantity: delivered,
        };
        let order = Order {
            id: OrderId::new(9),
            customer_id: CustomerId::new(2),
            customer_code: "C-2".to_string(),
            customer_name: "Ito".to_string(),
            order_date: date,
            note: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            details: vec![detail(1, 4, 4), detail(2, 2, 0)],
        };

        let view = OrderShowTemplate::from(&order);
        assert!(view.locked);
        assert!(view.has_remaining);
        assert_eq!(view.total, "¥1,500");
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.lines.last().map(|l| l.remaining), Some(2));
    }
}

//! Delivery route handlers.
//!
//! A delivery takes quantities from a customer's open order lines. The form
//! lists every line with quantity left; the repository re-checks the
//! remaining quantities under lock when saving.

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

use tradedesk_core::forms::{ALLOCATION_FIELD_PREFIX, DeliveryForm, FieldErrors};
use tradedesk_core::listing::ListQuery;
use tradedesk_core::{CustomerId, DeliveryId, Money};

use crate::{
    components::{DataTable, data_table::deliveries_table_config},
    db::{CustomerRepository, DeliveryRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::{RequireStore, set_flash},
    models::{CurrentStore, CustomerOption, Delivery, DeliverySummary, OpenOrderDetail},
    state::AppState,
};

use super::{CustomerChoice, Layout, render};

/// Delivery row view for the list.
#[derive(Debug, Clone)]
pub struct DeliveryRowView {
    pub id: i32,
    pub delivery_date: String,
    pub customer_code: String,
    pub customer_name: String,
    pub total_quantity: i64,
    pub total: String,
}

impl From<&DeliverySummary> for DeliveryRowView {
    fn from(delivery: &DeliverySummary) -> Self {
        Self {
            id: delivery.id.as_i32(),
            delivery_date: delivery.delivery_date.to_string(),
            customer_code: delivery.customer_code.clone(),
            customer_name: delivery.customer_name.clone(),
            total_quantity: delivery.total_quantity,
            total: delivery.total_amount.to_string(),
        }
    }
}

/// Delivered line view for the detail page.
#[derive(Debug, Clone)]
pub struct DeliveryLineView {
    pub order_id: i32,
    pub order_date: String,
    pub product_name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub amount: String,
}

/// Open order line in the allocation form.
#[derive(Debug, Clone)]
pub struct OpenLineView {
    /// Name of the quantity input.
    pub field: String,
    pub order_id: i32,
    pub order_date: String,
    pub product_name: String,
    pub unit_price: String,
    pub ordered: i64,
    pub delivered: i64,
    pub remaining: i64,
    /// Quantity typed in by the user, kept across a rejected submit.
    pub entered: String,
    pub error: String,
}

impl OpenLineView {
    fn new(detail: &OpenOrderDetail, form: &DeliveryForm, errors: &FieldErrors) -> Self {
        let id = detail.order_detail_id.to_string();
        let field = format!("{ALLOCATION_FIELD_PREFIX}{id}");
        let entered = form
            .allocations
            .iter()
            .find(|(raw_id, _)| raw_id.trim() == id)
            .map(|(_, qty)| qty.trim().to_string())
            .unwrap_or_default();
        Self {
            error: errors.get(&field).unwrap_or_default().to_string(),
            field,
            order_id: detail.order_id.as_i32(),
            order_date: detail.order_date.to_string(),
            product_name: detail.product_name.clone(),
            unit_price: Money::new(detail.unit_price).to_string(),
            ordered: detail.ordered_quantity,
            delivered: detail.delivered_quantity,
            remaining: detail.remaining_quantity,
            entered,
        }
    }
}

/// Deliveries list page template.
#[derive(Template)]
#[template(path = "deliveries/index.html")]
pub struct DeliveriesIndexTemplate {
    pub layout: Layout,
    pub table: DataTable<DeliveryRowView>,
}

/// Delivery detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "deliveries/show.html")]
pub struct DeliveryShowTemplate {
    pub layout: Layout,
    pub id: i32,
    pub customer_id: i32,
    pub customer_code: String,
    pub customer_name: String,
    pub delivery_date: String,
    pub note: String,
    pub total_quantity: i64,
    pub total: String,
    pub lines: Vec<DeliveryLineView>,
}

impl From<&Delivery> for DeliveryShowTemplate {
    fn from(delivery: &Delivery) -> Self {
        Self {
            layout: Layout::default(),
            id: delivery.id.as_i32(),
            customer_id: delivery.customer_id.as_i32(),
            customer_code: delivery.customer_code.clone(),
            customer_name: delivery.customer_name.clone(),
            delivery_date: delivery.delivery_date.to_string(),
            note: delivery.note.clone().unwrap_or_default(),
            total_quantity: delivery.total_quantity(),
            total: delivery.total_amount().to_string(),
            lines: delivery
                .details
                .iter()
                .map(|d| DeliveryLineView {
                    order_id: d.order_id.as_i32(),
                    order_date: d.order_date.to_string(),
                    product_name: d.product_name.clone(),
                    unit_price: Money::new(d.unit_price).to_string(),
                    quantity: d.quantity,
                    amount: d.amount().to_string(),
                })
                .collect(),
        }
    }
}

/// Delivery allocation form template.
#[derive(Template)]
#[template(path = "deliveries/form.html")]
pub struct DeliveryFormTemplate {
    pub layout: Layout,
    pub customers: Vec<CustomerChoice>,
    /// Selected customer; the line table is shown only once one is chosen.
    pub customer_id: Option<i32>,
    pub delivery_date: String,
    pub note: String,
    pub lines: Vec<OpenLineView>,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

impl DeliveryFormTemplate {
    /// Message for one field, empty when the field is fine.
    #[must_use]
    pub fn field_error(&self, field: &str) -> String {
        self.errors.get(field).unwrap_or_default().to_string()
    }
}

/// Query parameters for the new delivery form.
#[derive(Debug, Default, Deserialize)]
pub struct NewDeliveryQuery {
    pub customer_id: Option<String>,
}

fn parse_customer(raw: &str) -> Option<CustomerId> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(CustomerId::new)
}

async fn form_page(
    state: &AppState,
    session: &Session,
    store: &CurrentStore,
    form: &DeliveryForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Result<DeliveryFormTemplate, AppError> {
    let customers = CustomerRepository::new(state.pool(), store.id)
        .list()
        .await?;
    let options: Vec<CustomerOption> = customers.iter().map(CustomerOption::from).collect();

    // Only a customer of this store gets its lines listed
    let customer_id =
        parse_customer(&form.customer_id).filter(|id| options.iter().any(|o| o.id == *id));
    let lines = match customer_id {
        Some(id) => DeliveryRepository::new(state.pool(), store.id)
            .open_details(id)
            .await?
            .iter()
            .map(|detail| OpenLineView::new(detail, form, &errors))
            .collect(),
        None => vec![],
    };

    Ok(DeliveryFormTemplate {
        layout: Layout::for_store(session, store, "/deliveries").await,
        customers: CustomerChoice::list(&options, &form.customer_id),
        customer_id: customer_id.map(|id| id.as_i32()),
        delivery_date: form.delivery_date.clone(),
        note: form.note.clone(),
        lines,
        errors,
        error,
    })
}

fn rejected(template: &DeliveryFormTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, render(template)).into_response()
}

/// Deliveries list page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn index(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let deliveries = DeliveryRepository::new(state.pool(), store.id)
        .list()
        .await?;
    let listing = query.apply(deliveries, state.config().page_size);

    let template = DeliveriesIndexTemplate {
        layout: Layout::for_store(&session, &store, "/deliveries").await,
        table: deliveries_table_config().build(&query, &listing, |row| DeliveryRowView::from(row)),
    };

    Ok(render(&template))
}

/// Delivery detail page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn show(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<DeliveryShowTemplate, AppError> {
    let delivery = DeliveryRepository::new(state.pool(), store.id)
        .get(DeliveryId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {id}")))?;

    let mut template = DeliveryShowTemplate::from(&delivery);
    template.layout = Layout::for_store(&session, &store, "/deliveries").await;

    Ok(template)
}

/// New delivery form handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn new_delivery(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NewDeliveryQuery>,
) -> Result<Html<String>, AppError> {
    let form = DeliveryForm {
        customer_id: query.customer_id.unwrap_or_default(),
        delivery_date: chrono::Local::now().date_naive().to_string(),
        ..DeliveryForm::default()
    };
    let template = form_page(&state, &session, &store, &form, FieldErrors::new(), None).await?;
    Ok(render(&template))
}

/// Create delivery handler.
#[instrument(skip(store, state, session, pairs), fields(store_id = %store.id))]
pub async fn create(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let form = DeliveryForm::from_pairs(&pairs);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            let template = form_page(&state, &session, &store, &form, errors, None).await?;
            return Ok(rejected(&template));
        }
    };

    match DeliveryRepository::new(state.pool(), store.id)
        .create(&draft)
        .await
    {
        Ok(id) => {
            set_flash(&session, format!("Delivery #{id} recorded")).await?;
            Ok(Redirect::to(&format!("/deliveries/{id}")).into_response())
        }
        Err(e @ (RepositoryError::Conflict(_) | RepositoryError::Allocation { .. })) => {
            tracing::warn!(error = %e, "Delivery rejected");
            let template =
                form_page(&state, &session, &store, &form, FieldErrors::new(), Some(e.to_string()))
                    .await?;
            Ok(rejected(&template))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete delivery handler. The quantities become open again.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn delete(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match DeliveryRepository::new(state.pool(), store.id)
        .delete(DeliveryId::new(id))
        .await
    {
        Ok(()) => {
            set_flash(&session, format!("Delivery #{id} deleted")).await?;
            Ok(Redirect::to("/deliveries").into_response())
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("delivery {id}"))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tradedesk_core::{OrderDetailId, OrderId};

    use super::*;

    #[test]
    fn test_open_line_keeps_entered_quantity() {
        let detail = OpenOrderDetail {
            order_detail_id: OrderDetailId::new(41),
            order_id: OrderId::new(8),
            order_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            product_name: "Soy sauce".to_string(),
            unit_price: Decimal::from(480),
            ordered_quantity: 10,
            delivered_quantity: 6,
            remaining_quantity: 4,
        };
        let form = DeliveryForm::from_pairs(&[
            ("customer_id".to_string(), "3".to_string()),
            ("qty_40".to_string(), "1".to_string()),
            ("qty_41".to_string(), " 5 ".to_string()),
        ]);

        let mut errors = FieldErrors::new();
        errors.push("qty_41", "too many");

        let view = OpenLineView::new(&detail, &form, &errors);
        assert_eq!(view.field, "qty_41");
        assert_eq!(view.error, "too many");
        assert_eq!(view.entered, "5");
        assert_eq!(view.remaining, 4);
        assert_eq!(view.unit_price, "¥480");
    }

    #[test]
    fn test_parse_customer() {
        assert_eq!(parse_customer(" 12 "), Some(CustomerId::new(12)));
        assert_eq!(parse_customer("0"), None);
        assert_eq!(parse_customer(""), None);
    }
}

//! Customer route handlers, including CSV import and export.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use tradedesk_core::customer_csv::{self, ImportReport};
use tradedesk_core::forms::{CustomerForm, FieldErrors};
use tradedesk_core::listing::ListQuery;
use tradedesk_core::CustomerId;

use crate::{
    components::{DataTable, data_table::customers_table_config},
    db::{CustomerRepository, OrderRepository, RepositoryError},
    error::AppError,
    filters,
    middleware::{RequireStore, set_flash},
    models::{Customer, CurrentStore, ImportOutcome, OrderSummary},
    state::AppState,
};

use super::{Layout, csv_download, render};

/// Orders shown on the customer detail page.
const RECENT_ORDER_LIMIT: i64 = 10;

/// Multipart field carrying the CSV.
pub const IMPORT_FIELD: &str = "file";

/// Customer row view for the list.
#[derive(Debug, Clone)]
pub struct CustomerRowView {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub contact_person: String,
    pub address: String,
    pub phone: String,
    pub updated_at: String,
}

impl From<&Customer> for CustomerRowView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.as_i32(),
            code: customer.code.to_string(),
            name: customer.name.clone(),
            contact_person: customer.contact_person.clone().unwrap_or_default(),
            address: customer.address.clone().unwrap_or_default(),
            phone: customer
                .phone
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            updated_at: customer.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Order row on the customer detail page.
#[derive(Debug, Clone)]
pub struct CustomerOrderView {
    pub id: i32,
    pub order_date: String,
    pub line_count: i64,
    pub total: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&OrderSummary> for CustomerOrderView {
    fn from(order: &OrderSummary) -> Self {
        let progress = order.progress();
        Self {
            id: order.id.as_i32(),
            order_date: order.order_date.to_string(),
            line_count: order.line_count,
            total: order.total_amount.to_string(),
            status: progress.label(),
            status_class: progress.badge_class(),
        }
    }
}

/// Customers list page template.
#[derive(Template)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub layout: Layout,
    pub table: DataTable<CustomerRowView>,
}

/// Customer detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/show.html")]
pub struct CustomerShowTemplate {
    pub layout: Layout,
    pub customer: CustomerRowView,
    pub delivery_condition: String,
    pub note: String,
    pub created_at: String,
    pub orders: Vec<CustomerOrderView>,
}

/// Customer create/edit form template.
#[derive(Template)]
#[template(path = "customers/form.html")]
pub struct CustomerFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    pub cancel_href: String,
    pub form: CustomerForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

impl CustomerFormTemplate {
    /// Message for one field, empty when the field is fine.
    #[must_use]
    pub fn field_error(&self, field: &str) -> String {
        self.errors.get(field).unwrap_or_default().to_string()
    }
}

/// Import page template.
#[derive(Template)]
#[template(path = "customers/import.html")]
pub struct CustomerImportTemplate {
    pub layout: Layout,
    pub max_bytes: usize,
    pub file_name: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub outcome: Option<ImportOutcome>,
}

async fn load_customer(
    repo: &CustomerRepository<'_>,
    id: i32,
) -> Result<Customer, AppError> {
    repo.get(CustomerId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))
}

/// Customers list page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn index(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let customers = CustomerRepository::new(state.pool(), store.id)
        .list()
        .await?;
    let listing = query.apply(customers, state.config().page_size);

    let template = CustomersIndexTemplate {
        layout: Layout::for_store(&session, &store, "/customers").await,
        table: customers_table_config().build(&query, &listing, |row| CustomerRowView::from(row)),
    };

    Ok(render(&template))
}

/// Customer detail page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn show(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<CustomerShowTemplate, AppError> {
    let customer = load_customer(&CustomerRepository::new(state.pool(), store.id), id).await?;
    let orders = OrderRepository::new(state.pool(), store.id)
        .list_for_customer(customer.id, RECENT_ORDER_LIMIT)
        .await?;

    let template = CustomerShowTemplate {
        layout: Layout::for_store(&session, &store, "/customers").await,
        delivery_condition: customer.delivery_condition.clone().unwrap_or_default(),
        note: customer.note.clone().unwrap_or_default(),
        created_at: customer.created_at.format("%Y-%m-%d %H:%M").to_string(),
        customer: CustomerRowView::from(&customer),
        orders: orders.iter().map(CustomerOrderView::from).collect(),
    };

    Ok(template)
}

async fn form_page(
    session: &Session,
    store: &CurrentStore,
    editing: Option<i32>,
    form: CustomerForm,
    errors: FieldErrors,
    error: Option<String>,
) -> CustomerFormTemplate {
    let (title, action, cancel_href) = match editing {
        Some(id) => (
            "Edit customer".to_string(),
            format!("/customers/{id}"),
            format!("/customers/{id}"),
        ),
        None => (
            "New customer".to_string(),
            "/customers".to_string(),
            "/customers".to_string(),
        ),
    };
    CustomerFormTemplate {
        layout: Layout::for_store(session, store, "/customers").await,
        title,
        action,
        cancel_href,
        form,
        errors,
        error,
    }
}

/// Re-render a rejected form.
fn rejected(template: &CustomerFormTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, render(template)).into_response()
}

/// New customer form handler.
#[instrument(skip(store, session), fields(store_id = %store.id))]
pub async fn new_customer(
    RequireStore(store): RequireStore,
    session: Session,
) -> Html<String> {
    let template = form_page(
        &session,
        &store,
        None,
        CustomerForm::default(),
        FieldErrors::new(),
        None,
    )
    .await;
    render(&template)
}

/// Create customer handler.
#[instrument(skip(store, state, session, form), fields(store_id = %store.id))]
pub async fn create(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(rejected(
                &form_page(&session, &store, None, form, errors, None).await,
            ));
        }
    };

    match CustomerRepository::new(state.pool(), store.id)
        .create(&draft)
        .await
    {
        Ok(customer) => {
            tracing::info!(customer_id = %customer.id, code = %customer.code, "Customer created");
            set_flash(&session, format!("Customer {} created", customer.code)).await?;
            Ok(Redirect::to(&format!("/customers/{}", customer.id)).into_response())
        }
        Err(RepositoryError::Conflict(message)) => Ok(rejected(
            &form_page(&session, &store, None, form, FieldErrors::new(), Some(message)).await,
        )),
        Err(e) => Err(e.into()),
    }
}

/// Edit customer form handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn edit(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let customer = load_customer(&CustomerRepository::new(state.pool(), store.id), id).await?;
    let template = form_page(
        &session,
        &store,
        Some(id),
        customer.to_form(),
        FieldErrors::new(),
        None,
    )
    .await;
    Ok(render(&template))
}

/// Update customer handler.
#[instrument(skip(store, state, session, form), fields(store_id = %store.id))]
pub async fn update(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(rejected(
                &form_page(&session, &store, Some(id), form, errors, None).await,
            ));
        }
    };

    match CustomerRepository::new(state.pool(), store.id)
        .update(CustomerId::new(id), &draft)
        .await
    {
        Ok(customer) => {
            tracing::info!(customer_id = %customer.id, "Customer updated");
            set_flash(&session, format!("Customer {} saved", customer.code)).await?;
            Ok(Redirect::to(&format!("/customers/{id}")).into_response())
        }
        Err(RepositoryError::Conflict(message)) => Ok(rejected(
            &form_page(
                &session,
                &store,
                Some(id),
                form,
                FieldErrors::new(),
                Some(message),
            )
            .await,
        )),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("customer {id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Delete customer handler.
///
/// Customers with orders or deliveries are kept; the reason is shown on the
/// detail page.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn delete(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match CustomerRepository::new(state.pool(), store.id)
        .delete(CustomerId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(customer_id = id, "Customer deleted");
            set_flash(&session, "Customer deleted").await?;
            Ok(Redirect::to("/customers").into_response())
        }
        Err(RepositoryError::Conflict(message)) => {
            tracing::warn!(customer_id = id, reason = %message, "Customer delete refused");
            set_flash(&session, message).await?;
            Ok(Redirect::to(&format!("/customers/{id}")).into_response())
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("customer {id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Import page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn import_page(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
) -> Html<String> {
    let template = CustomerImportTemplate {
        layout: Layout::for_store(&session, &store, "/customers").await,
        max_bytes: state.config().import_max_bytes,
        file_name: None,
        errors: vec![],
        warnings: vec![],
        outcome: None,
    };
    render(&template)
}

fn check_upload_size(len: usize, max_bytes: usize) -> Result<(), String> {
    if len == 0 {
        return Err("choose a CSV file to import".to_string());
    }
    if len > max_bytes {
        return Err(format!(
            "the file is {len} bytes; the limit is {max_bytes} bytes"
        ));
    }
    Ok(())
}

/// Read the uploaded CSV, enforcing the size limit.
///
/// Returns the file name and bytes, or a message for the user.
async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), String> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| format!("could not read the upload: {}", e.body_text()))?;
        let Some(field) = field else {
            return Err("choose a CSV file to import".to_string());
        };
        if field.name() != Some(IMPORT_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("could not read the upload: {}", e.body_text()))?;
        check_upload_size(bytes.len(), max_bytes)?;
        return Ok((file_name, bytes.to_vec()));
    }
}

/// Import handler.
///
/// The CSV is checked as a whole; customers are written only when the file
/// has no errors, and then in a single transaction.
#[instrument(skip(store, state, session, multipart), fields(store_id = %store.id))]
pub async fn import(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let max_bytes = state.config().import_max_bytes;
    let mut template = CustomerImportTemplate {
        layout: Layout::for_store(&session, &store, "/customers").await,
        max_bytes,
        file_name: None,
        errors: vec![],
        warnings: vec![],
        outcome: None,
    };

    let (file_name, bytes) = match read_upload(&mut multipart, max_bytes).await {
        Ok(upload) => upload,
        Err(message) => {
            template.errors.push(message);
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)).into_response());
        }
    };

    let report: ImportReport = customer_csv::import_customer_csv(&bytes, &store.name);
    template.file_name = Some(file_name);
    template.errors = report.error_messages();
    template.warnings = report.warning_messages();

    if !report.is_importable() {
        tracing::warn!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Customer import rejected"
        );
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, render(&template)).into_response());
    }

    let drafts: Vec<_> = report.records.into_iter().map(|r| r.customer).collect();
    let outcome = CustomerRepository::new(state.pool(), store.id)
        .upsert_many(&drafts)
        .await?;
    template.outcome = Some(outcome);

    Ok(render(&template).into_response())
}

/// Export handler: every customer of the store as a Shift_JIS CSV.
#[instrument(skip(store, state), fields(store_id = %store.id))]
pub async fn export(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let customers = CustomerRepository::new(state.pool(), store.id)
        .list()
        .await?;
    let rows: Vec<_> = customers
        .iter()
        .map(|c| c.to_csv_row(&store.name))
        .collect();

    let exported = customer_csv::write_customer_csv(&rows)
        .map_err(|e| AppError::Internal(format!("customer export: {e}")))?;
    if exported.replaced {
        tracing::warn!("Some characters could not be written as Shift_JIS and were replaced");
    }
    tracing::info!(customers = rows.len(), "Customers exported");

    Ok(csv_download("customers.csv", exported.bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use tradedesk_core::{CustomerCode, Money, OrderId, StoreId};

    use super::*;

    #[test]
    fn test_upload_size_limit() {
        assert_eq!(check_upload_size(1024, 1024), Ok(()));
        assert_eq!(
            check_upload_size(1025, 1024),
            Err("the file is 1025 bytes; the limit is 1024 bytes".to_string())
        );
        assert_eq!(
            check_upload_size(0, 1024),
            Err("choose a CSV file to import".to_string())
        );
    }

    #[test]
    fn test_customer_row_view_fills_blanks() {
        let customer = Customer {
            id: CustomerId::new(7),
            store_id: StoreId::new(1),
            code: CustomerCode::parse("C-7").unwrap(),
            name: "Tanaka Foods".to_string(),
            contact_person: None,
            address: Some("Osaka".to_string()),
            phone: None,
            delivery_condition: None,
            note: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        };
        let view = CustomerRowView::from(&customer);
        assert_eq!(view.id, 7);
        assert_eq!(view.code, "C-7");
        assert_eq!(view.contact_person, "");
        assert_eq!(view.address, "Osaka");
        assert_eq!(view.updated_at, "1970-01-01 00:00");
    }

    #[test]
    fn test_order_view_shows_progress() {
        let order = OrderSummary {
            id: OrderId::new(3),
            customer_id: CustomerId::new(7),
            customer_code: "C-7".to_string(),
            customer_name: "Tanaka Foods".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            note: None,
            line_count: 2,
            total_amount: Money::from_yen(12_000),
            ordered_quantity: 10,
            delivered_quantity: 4,
        };
        let view = CustomerOrderView::from(&order);
        assert_eq!(view.total, "¥12,000");
        assert_eq!(view.status, order.progress().label());
    }
}

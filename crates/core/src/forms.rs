//! Form input validation.
//!
//! Forms arrive as raw strings. `validate()` turns them into drafts with
//! typed fields, or into a list of field errors to show next to the form.
//! The CSV importer runs customer rows through the same [`CustomerForm`]
//! rules.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CustomerCode, CustomerId, OrderDetailId, PhoneNumber};

/// Maximum length of a customer name.
pub const NAME_MAX: usize = 100;
/// Maximum length of a contact person.
pub const CONTACT_PERSON_MAX: usize = 50;
/// Maximum length of an address.
pub const ADDRESS_MAX: usize = 200;
/// Maximum length of a delivery condition.
pub const DELIVERY_CONDITION_MAX: usize = 100;
/// Maximum length of a note.
pub const NOTE_MAX: usize = 500;
/// Maximum length of a product name.
pub const PRODUCT_NAME_MAX: usize = 100;
/// Largest quantity accepted on a single order line.
pub const QUANTITY_MAX: i32 = 1_000_000;
/// Decimal places a unit price may carry (`NUMERIC(12, 2)`).
pub const UNIT_PRICE_SCALE: u32 = 2;

/// Largest unit price the `NUMERIC(12, 2)` column holds: 9,999,999,999.99.
pub const UNIT_PRICE_MAX: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A validation message attached to a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

/// All validation messages of one form submission, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Create an empty error list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a message for a field.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    /// The first message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// All messages, without field names.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for FieldErrors {}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Trimmed value, `None` when blank.
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Record an error when an optional text field is over its limit.
fn check_length(errors: &mut FieldErrors, field: &str, label: &str, value: Option<&str>, max: usize) {
    if value.is_some_and(|v| v.chars().count() > max) {
        errors.push(field, format!("{label} must be at most {max} characters"));
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn parse_customer_id(value: &str) -> Option<CustomerId> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .map(CustomerId::new)
}

// =============================================================================
// Customers
// =============================================================================

/// Raw customer form input (also one CSV row).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub delivery_condition: String,
    #[serde(default)]
    pub note: String,
}

/// A validated customer, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerDraft {
    pub code: CustomerCode,
    pub name: String,
    pub contact_person: Option<String>,
    pub address: Option<String>,
    pub phone: Option<PhoneNumber>,
    pub delivery_condition: Option<String>,
    pub note: Option<String>,
}

impl CustomerForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every field problem found; validation does not stop at the
    /// first one.
    pub fn validate(&self) -> Result<CustomerDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let code = CustomerCode::parse(&self.code)
            .map_err(|e| errors.push("code", e.to_string()))
            .ok();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.push("name", "customer name is required");
        } else {
            check_length(&mut errors, "name", "customer name", Some(&name), NAME_MAX);
        }

        let contact_person = optional(&self.contact_person);
        check_length(
            &mut errors,
            "contact_person",
            "contact person",
            contact_person.as_deref(),
            CONTACT_PERSON_MAX,
        );

        let address = optional(&self.address);
        check_length(&mut errors, "address", "address", address.as_deref(), ADDRESS_MAX);

        let phone = match optional(&self.phone) {
            Some(raw) => PhoneNumber::parse(&raw)
                .map_err(|e| errors.push("phone", e.to_string()))
                .ok(),
            None => None,
        };

        let delivery_condition = optional(&self.delivery_condition);
        check_length(
            &mut errors,
            "delivery_condition",
            "delivery condition",
            delivery_condition.as_deref(),
            DELIVERY_CONDITION_MAX,
        );

        let note = optional(&self.note);
        check_length(&mut errors, "note", "note", note.as_deref(), NOTE_MAX);

        match code {
            Some(code) if errors.is_empty() => Ok(CustomerDraft {
                code,
                name,
                contact_person,
                address,
                phone,
                delivery_condition,
                note,
            }),
            _ => Err(errors),
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Raw order line input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineForm {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub unit_price: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub description: String,
}

impl OrderLineForm {
    fn is_blank(&self) -> bool {
        self.product_name.trim().is_empty()
            && self.unit_price.trim().is_empty()
            && self.quantity.trim().is_empty()
            && self.description.trim().is_empty()
    }
}

/// Raw order form input.
///
/// HTML forms submit the lines as repeated `product_name`, `unit_price`,
/// `quantity` and `description` fields; see [`OrderForm::from_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderForm {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub lines: Vec<OrderLineForm>,
}

/// A validated order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineDraft {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub description: Option<String>,
}

/// A validated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDraft {
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub note: Option<String>,
    pub lines: Vec<OrderLineDraft>,
}

impl OrderForm {
    /// Build the form from decoded `application/x-www-form-urlencoded` pairs.
    ///
    /// The n-th occurrence of a line field belongs to line n.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self::default();
        let mut counters = [0usize; 4];

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "customer_id" => {
                    form.customer_id.clone_from(value);
                    continue;
                }
                "order_date" => {
                    form.order_date.clone_from(value);
                    continue;
                }
                "note" => {
                    form.note.clone_from(value);
                    continue;
                }
                "product_name" => 0,
                "unit_price" => 1,
                "quantity" => 2,
                "description" => 3,
                _ => continue,
            };

            let Some(counter) = counters.get_mut(slot) else {
                continue;
            };
            let index = *counter;
            *counter += 1;
            if form.lines.len() <= index {
                form.lines.resize_with(index + 1, OrderLineForm::default);
            }
            if let Some(line) = form.lines.get_mut(index) {
                let target = match slot {
                    0 => &mut line.product_name,
                    1 => &mut line.unit_price,
                    2 => &mut line.quantity,
                    _ => &mut line.description,
                };
                target.clone_from(value);
            }
        }

        form
    }

    /// Validate the form. Completely blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns every problem found, with line messages numbered from 1.
    pub fn validate(&self) -> Result<OrderDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let customer_id = parse_customer_id(&self.customer_id);
        if customer_id.is_none() {
            errors.push("customer_id", "select a customer");
        }

        let order_date = parse_date(&self.order_date);
        if order_date.is_none() {
            errors.push("order_date", "order date must be a valid date (YYYY-MM-DD)");
        }

        let note = optional(&self.note);
        check_length(&mut errors, "note", "note", note.as_deref(), NOTE_MAX);

        let mut lines = Vec::new();
        for (i, line) in self.lines.iter().enumerate().filter(|(_, l)| !l.is_blank()) {
            if let Some(draft) = validate_line(line, i + 1, &mut errors) {
                lines.push(draft);
            }
        }
        if self.lines.iter().all(OrderLineForm::is_blank) {
            errors.push("lines", "add at least one order line");
        }

        match (customer_id, order_date) {
            (Some(customer_id), Some(order_date)) if errors.is_empty() => Ok(OrderDraft {
                customer_id,
                order_date,
                note,
                lines,
            }),
            _ => Err(errors),
        }
    }
}

fn validate_line(line: &OrderLineForm, number: usize, errors: &mut FieldErrors) -> Option<OrderLineDraft> {
    let before = errors.len();

    let product_name = line.product_name.trim().to_string();
    if product_name.is_empty() {
        errors.push(
            format!("lines[{number}].product_name"),
            format!("line {number}: product name is required"),
        );
    } else if product_name.chars().count() > PRODUCT_NAME_MAX {
        errors.push(
            format!("lines[{number}].product_name"),
            format!("line {number}: product name must be at most {PRODUCT_NAME_MAX} characters"),
        );
    }

    let unit_price = match parse_unit_price(&line.unit_price) {
        Ok(price) => Some(price),
        Err(message) => {
            errors.push(
                format!("lines[{number}].unit_price"),
                format!("line {number}: {message}"),
            );
            None
        }
    };

    let quantity = line
        .quantity
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|q| (1..=QUANTITY_MAX).contains(q));
    if quantity.is_none() {
        errors.push(
            format!("lines[{number}].quantity"),
            format!("line {number}: quantity must be a whole number between 1 and {QUANTITY_MAX}"),
        );
    }

    let description = optional(&line.description);
    if description.as_deref().is_some_and(|d| d.chars().count() > NOTE_MAX) {
        errors.push(
            format!("lines[{number}].description"),
            format!("line {number}: description must be at most {NOTE_MAX} characters"),
        );
    }

    if errors.len() > before {
        return None;
    }
    Some(OrderLineDraft {
        product_name,
        unit_price: unit_price?,
        quantity: quantity?,
        description,
    })
}

fn parse_unit_price(raw: &str) -> Result<Decimal, String> {
    let price = raw
        .trim()
        .replace(',', "")
        .parse::<Decimal>()
        .ok()
        .filter(|p| !p.is_sign_negative())
        .ok_or_else(|| "unit price must be a non-negative number".to_string())?;
    if price.normalize().scale() > UNIT_PRICE_SCALE {
        return Err(format!(
            "unit price can have at most {UNIT_PRICE_SCALE} decimal places"
        ));
    }
    if price > UNIT_PRICE_MAX {
        return Err(format!("unit price must be at most {UNIT_PRICE_MAX}"));
    }
    Ok(price)
}

// =============================================================================
// Deliveries
// =============================================================================

/// Raw delivery form input.
///
/// Allocations arrive as `qty_<order detail id>` fields; see
/// [`DeliveryForm::from_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryForm {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub delivery_date: String,
    #[serde(default)]
    pub note: String,
    /// `(order detail id, quantity)` pairs, both raw.
    #[serde(default)]
    pub allocations: Vec<(String, String)>,
}

/// A validated delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryDraft {
    pub customer_id: CustomerId,
    pub delivery_date: NaiveDate,
    pub note: Option<String>,
    /// Quantities to deliver per order line; every quantity is positive.
    pub allocations: Vec<(OrderDetailId, i32)>,
}

/// Prefix of delivery quantity fields.
pub const ALLOCATION_FIELD_PREFIX: &str = "qty_";

impl DeliveryForm {
    /// Build the form from decoded `application/x-www-form-urlencoded` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "customer_id" => form.customer_id.clone_from(value),
                "delivery_date" => form.delivery_date.clone_from(value),
                "note" => form.note.clone_from(value),
                other => {
                    if let Some(id) = other.strip_prefix(ALLOCATION_FIELD_PREFIX) {
                        form.allocations.push((id.to_string(), value.clone()));
                    }
                }
            }
        }
        form
    }

    /// Validate the form. Blank and zero quantities are skipped.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<DeliveryDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let customer_id = parse_customer_id(&self.customer_id);
        if customer_id.is_none() {
            errors.push("customer_id", "select a customer");
        }

        let delivery_date = parse_date(&self.delivery_date);
        if delivery_date.is_none() {
            errors.push(
                "delivery_date",
                "delivery date must be a valid date (YYYY-MM-DD)",
            );
        }

        let note = optional(&self.note);
        check_length(&mut errors, "note", "note", note.as_deref(), NOTE_MAX);

        let mut allocations = Vec::new();
        for (raw_id, raw_qty) in &self.allocations {
            let raw_qty = raw_qty.trim();
            if raw_qty.is_empty() {
                continue;
            }
            let field = format!("{ALLOCATION_FIELD_PREFIX}{raw_id}");
            let Ok(detail_id) = raw_id.trim().parse::<i32>() else {
                errors.push(field, format!("unknown order line '{raw_id}'"));
                continue;
            };
            match raw_qty.parse::<i32>() {
                Ok(0) => {}
                Ok(qty) if qty > 0 => allocations.push((OrderDetailId::new(detail_id), qty)),
                _ => errors.push(
                    field,
                    format!("quantity for order line {detail_id} must be a positive whole number"),
                ),
            }
        }
        if allocations.is_empty() && errors.iter().all(|e| !e.field.starts_with(ALLOCATION_FIELD_PREFIX)) {
            errors.push("allocations", "enter a quantity for at least one order line");
        }

        match (customer_id, delivery_date) {
            (Some(customer_id), Some(delivery_date)) if errors.is_empty() => Ok(DeliveryDraft {
                customer_id,
                delivery_date,
                note,
                allocations,
            }),
            _ => Err(errors),
        }
    }
}

//! Order domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tradedesk_core::forms::{OrderForm, OrderLineForm};
use tradedesk_core::listing::{Listable, SortKey};
use tradedesk_core::{
    CustomerId, DeliveryProgress, Money, OrderDetailId, OrderId, allocation, sort_fields,
};

/// One row of the order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_code: String,
    pub customer_name: String,
    pub order_date: NaiveDate,
    pub note: Option<String>,
    pub line_count: i64,
    pub total_amount: Money,
    pub ordered_quantity: i64,
    pub delivered_quantity: i64,
}

impl OrderSummary {
    /// Delivery progress over all lines.
    #[must_use]
    pub const fn progress(&self) -> DeliveryProgress {
        DeliveryProgress::from_quantities(self.ordered_quantity, self.delivered_quantity)
    }
}

sort_fields! {
    /// Sortable columns of the order list.
    pub enum OrderField {
        Id => "id",
        OrderDate => "order_date",
        Customer => "customer",
        Lines => "lines",
        Total => "total",
        Progress => "progress",
    }
}

impl Listable for OrderSummary {
    type Field = OrderField;

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.customer_code.as_str(), self.customer_name.as_str()];
        text.extend(self.note.as_deref());
        text
    }

    fn sort_key(&self, field: OrderField) -> SortKey {
        match field {
            OrderField::Id => SortKey::Int(i64::from(self.id.as_i32())),
            OrderField::OrderDate => SortKey::Date(self.order_date),
            OrderField::Customer => SortKey::text(&self.customer_name),
            OrderField::Lines => SortKey::Int(self.line_count),
            OrderField::Total => SortKey::Amount(self.total_amount.amount()),
            OrderField::Progress => SortKey::Int(match self.progress() {
                DeliveryProgress::Undelivered => 0,
                DeliveryProgress::PartiallyDelivered => 1,
                DeliveryProgress::Delivered => 2,
            }),
        }
    }
}

/// An order line with the quantity delivered so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub position: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub description: Option<String>,
    pub delivered_quantity: i64,
}

impl OrderDetail {
    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Money {
        Money::line_total(self.unit_price, self.quantity)
    }

    /// Quantity still to deliver.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        allocation::remaining(i64::from(self.quantity), self.delivered_quantity)
    }

    /// Delivery progress of this line.
    #[must_use]
    pub fn progress(&self) -> DeliveryProgress {
        DeliveryProgress::from_quantities(i64::from(self.quantity), self.delivered_quantity)
    }
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub customer_code: String,
    pub customer_name: String,
    pub order_date: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: Vec<OrderDetail>,
}

impl Order {
    /// Sum of line totals.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.details.iter().map(OrderDetail::line_total).sum()
    }

    /// Whether any line has deliveries recorded against it.
    #[must_use]
    pub fn has_deliveries(&self) -> bool {
        self.details.iter().any(|d| d.delivered_quantity > 0)
    }

    /// Delivery progress over all lines.
    #[must_use]
    pub fn progress(&self) -> DeliveryProgress {
        let ordered = self.details.iter().map(|d| i64::from(d.quantity)).sum();
        let delivered = self.details.iter().map(|d| d.delivered_quantity).sum();
        DeliveryProgress::from_quantities(ordered, delivered)
    }

    /// The order as an editable form.
    #[must_use]
    pub fn to_form(&self) -> OrderForm {
        OrderForm {
            customer_id: self.customer_id.to_string(),
            order_date: self.order_date.format("%Y-%m-%d").to_string(),
            note: self.note.clone().unwrap_or_default(),
            lines: self
                .details
                .iter()
                .map(|d| OrderLineForm {
                    product_name: d.product_name.clone(),
                    unit_price: d.unit_price.normalize().to_string(),
                    quantity: d.quantity.to_string(),
                    description: d.description.clone().unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detail(quantity: i32, delivered: i64, unit_price: Decimal) -> OrderDetail {
        OrderDetail {
            id: OrderDetailId::new(1),
            order_id: OrderId::new(1),
            position: 1,
            product_name: "Rice".to_string(),
            unit_price,
            quantity,
            description: None,
            delivered_quantity: delivered,
        }
    }

    fn order(details: Vec<OrderDetail>) -> Order {
        Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(3),
            customer_code: "C-3".to_string(),
            customer_name: "Sato".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            note: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            details,
        }
    }

    #[test]
    fn test_totals_and_progress() {
        let order = order(vec![
            detail(3, 3, Decimal::new(1200, 0)),
            detail(2, 0, Decimal::new(3505, 1)),
        ]);
        assert_eq!(order.total_amount(), Money::new(Decimal::new(43010, 1)));
        assert_eq!(order.progress(), DeliveryProgress::PartiallyDelivered);
        assert!(order.has_deliveries());
    }

    #[test]
    fn test_detail_remaining() {
        assert_eq!(detail(5, 2, Decimal::ONE).remaining(), 3);
        assert_eq!(detail(5, 5, Decimal::ONE).progress(), DeliveryProgress::Delivered);
    }

    #[test]
    fn test_to_form_round_trips_through_validation() {
        let order = order(vec![detail(2, 0, Decimal::new(35050, 2))]);
        let form = order.to_form();
        assert_eq!(form.order_date, "2026-04-01");
        assert_eq!(form.lines[0].unit_price, "350.5");
        let draft = form.validate().unwrap();
        assert_eq!(draft.customer_id, CustomerId::new(3));
        assert_eq!(draft.lines[0].quantity, 2);
    }
}

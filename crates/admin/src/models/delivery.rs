//! Delivery domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tradedesk_core::listing::{Listable, SortKey};
use tradedesk_core::{CustomerId, DeliveryDetailId, DeliveryId, Money, OrderDetailId, OrderId, sort_fields};

/// One row of the delivery list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub id: DeliveryId,
    pub customer_id: CustomerId,
    pub customer_code: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub note: Option<String>,
    pub line_count: i64,
    pub total_quantity: i64,
    pub total_amount: Money,
}

sort_fields! {
    /// Sortable columns of the delivery list.
    pub enum DeliveryField {
        Id => "id",
        DeliveryDate => "delivery_date",
        Customer => "customer",
        Quantity => "quantity",
        Total => "total",
    }
}

impl Listable for DeliverySummary {
    type Field = DeliveryField;

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.customer_code.as_str(), self.customer_name.as_str()];
        text.extend(self.note.as_deref());
        text
    }

    fn sort_key(&self, field: DeliveryField) -> SortKey {
        match field {
            DeliveryField::Id => SortKey::Int(i64::from(self.id.as_i32())),
            DeliveryField::DeliveryDate => SortKey::Date(self.delivery_date),
            DeliveryField::Customer => SortKey::text(&self.customer_name),
            DeliveryField::Quantity => SortKey::Int(self.total_quantity),
            DeliveryField::Total => SortKey::Amount(self.total_amount.amount()),
        }
    }
}

/// A delivered quantity of one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryDetail {
    pub id: DeliveryDetailId,
    pub order_detail_id: OrderDetailId,
    pub order_id: OrderId,
    pub order_date: NaiveDate,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl DeliveryDetail {
    /// Value of the delivered quantity.
    #[must_use]
    pub fn amount(&self) -> Money {
        Money::line_total(self.unit_price, self.quantity)
    }
}

/// A delivery with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub customer_id: CustomerId,
    pub customer_code: String,
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub details: Vec<DeliveryDetail>,
}

impl Delivery {
    /// Total delivered value.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.details.iter().map(DeliveryDetail::amount).sum()
    }

    /// Total delivered units.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.details.iter().map(|d| i64::from(d.quantity)).sum()
    }
}

/// An order line of a customer with quantity left to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOrderDetail {
    pub order_detail_id: OrderDetailId,
    pub order_id: OrderId,
    pub order_date: NaiveDate,
    pub product_name: String,
    pub unit_price: Decimal,
    pub ordered_quantity: i64,
    pub delivered_quantity: i64,
    pub remaining_quantity: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_totals() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let line = |id: i32, quantity: i32, price: i64| DeliveryDetail {
            id: DeliveryDetailId::new(id),
            order_detail_id: OrderDetailId::new(id),
            order_id: OrderId::new(1),
            order_date: date,
            product_name: "Miso".to_string(),
            unit_price: Decimal::from(price),
            quantity,
        };
        let delivery = Delivery {
            id: DeliveryId::new(1),
            customer_id: CustomerId::new(1),
            customer_code: "C-1".to_string(),
            customer_name: "Sato".to_string(),
            delivery_date: date,
            note: None,
            created_at: DateTime::UNIX_EPOCH,
            details: vec![line(1, 2, 500), line(2, 3, 100)],
        };
        assert_eq!(delivery.total_quantity(), 5);
        assert_eq!(delivery.total_amount(), Money::from_yen(1300));
    }
}

//! Per-customer sales statistics.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedesk_core::listing::{Listable, SortKey};
use tradedesk_core::{CustomerId, Money, sort_fields};

/// Statistics of one customer over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerStatistics {
    pub customer_id: CustomerId,
    pub customer_code: String,
    pub customer_name: String,
    pub order_count: i64,
    pub ordered_quantity: i64,
    pub delivered_quantity: i64,
    pub sales_amount: Money,
    pub delivered_amount: Money,
    /// Mean days between order date and delivery date over delivered lines.
    pub average_lead_days: Option<Decimal>,
}

impl CustomerStatistics {
    /// Ordered units not yet delivered.
    #[must_use]
    pub fn undelivered_quantity(&self) -> i64 {
        (self.ordered_quantity - self.delivered_quantity).max(0)
    }

    /// Lead time rounded to one decimal, for display.
    #[must_use]
    pub fn lead_days_display(&self) -> String {
        self.average_lead_days
            .map_or_else(|| "-".to_string(), |d| d.round_dp(1).to_string())
    }
}

sort_fields! {
    /// Sortable columns of the statistics table.
    pub enum StatisticsField {
        Code => "code",
        Name => "name",
        Orders => "orders",
        Ordered => "ordered",
        Delivered => "delivered",
        Sales => "sales",
        DeliveredAmount => "delivered_amount",
        LeadTime => "lead_time",
    }
}

impl Listable for CustomerStatistics {
    type Field = StatisticsField;

    fn search_text(&self) -> Vec<&str> {
        vec![self.customer_code.as_str(), self.customer_name.as_str()]
    }

    fn sort_key(&self, field: StatisticsField) -> SortKey {
        match field {
            StatisticsField::Code => SortKey::text(&self.customer_code),
            StatisticsField::Name => SortKey::text(&self.customer_name),
            StatisticsField::Orders => SortKey::Int(self.order_count),
            StatisticsField::Ordered => SortKey::Int(self.ordered_quantity),
            StatisticsField::Delivered => SortKey::Int(self.delivered_quantity),
            StatisticsField::Sales => SortKey::Amount(self.sales_amount.amount()),
            StatisticsField::DeliveredAmount => SortKey::Amount(self.delivered_amount.amount()),
            StatisticsField::LeadTime => self
                .average_lead_days
                .map_or(SortKey::Empty, SortKey::Amount),
        }
    }
}

/// Raw date range from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Inclusive order-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Resolve the query against `today`.
    ///
    /// Missing or malformed bounds default to the first day of the current
    /// month and `today`. Reversed bounds are swapped.
    #[must_use]
    pub fn resolve(query: &DateRangeQuery, today: NaiveDate) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        };
        let month_start = today.with_day(1).unwrap_or(today);
        let from = parse(query.from.as_deref()).unwrap_or(month_start);
        let to = parse(query.to.as_deref()).unwrap_or(today);
        if from <= to {
            Self { from, to }
        } else {
            Self { from: to, to: from }
        }
    }

    /// Parameters to carry over into list links.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("from".to_string(), self.from.format("%Y-%m-%d").to_string()),
            ("to".to_string(), self.to.format("%Y-%m-%d").to_string()),
        ]
    }
}

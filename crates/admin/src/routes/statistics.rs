//! Per-customer statistics handlers.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use tradedesk_core::customer_csv::write_shift_jis_csv;
use tradedesk_core::listing::ListQuery;

use crate::{
    components::{DataTable, data_table::statistics_table_config},
    db::StatisticsRepository,
    error::AppError,
    filters,
    middleware::RequireStore,
    models::{CustomerStatistics, DateRange, DateRangeQuery},
    state::AppState,
};

use super::{Layout, csv_download, render};

/// Column headers of the statistics CSV.
pub const EXPORT_HEADERS: [&str; 9] = [
    "顧客ID",
    "顧客名",
    "受注件数",
    "受注数量",
    "納品数量",
    "未納品数量",
    "売上金額",
    "納品金額",
    "平均リードタイム(日)",
];

/// Statistics row view.
#[derive(Debug, Clone)]
pub struct StatisticsRowView {
    pub customer_id: i32,
    pub customer_code: String,
    pub customer_name: String,
    pub order_count: i64,
    pub ordered: i64,
    pub delivered: i64,
    pub undelivered: i64,
    pub sales: String,
    pub delivered_amount: String,
    pub lead_days: String,
}

impl From<&CustomerStatistics> for StatisticsRowView {
    fn from(row: &CustomerStatistics) -> Self {
        Self {
            customer_id: row.customer_id.as_i32(),
            customer_code: row.customer_code.clone(),
            customer_name: row.customer_name.clone(),
            order_count: row.order_count,
            ordered: row.ordered_quantity,
            delivered: row.delivered_quantity,
            undelivered: row.undelivered_quantity(),
            sales: row.sales_amount.to_string(),
            delivered_amount: row.delivered_amount.to_string(),
            lead_days: row.lead_days_display(),
        }
    }
}

/// Sums over every row of the period, not just the visible page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsTotals {
    pub customers: usize,
    pub order_count: i64,
    pub ordered: i64,
    pub delivered: i64,
    pub sales: String,
    pub delivered_amount: String,
}

impl StatisticsTotals {
    fn new(rows: &[CustomerStatistics]) -> Self {
        Self {
            customers: rows.len(),
            order_count: rows.iter().map(|r| r.order_count).sum(),
            ordered: rows.iter().map(|r| r.ordered_quantity).sum(),
            delivered: rows.iter().map(|r| r.delivered_quantity).sum(),
            sales: rows
                .iter()
                .map(|r| r.sales_amount)
                .sum::<tradedesk_core::Money>()
                .to_string(),
            delivered_amount: rows
                .iter()
                .map(|r| r.delivered_amount)
                .sum::<tradedesk_core::Money>()
                .to_string(),
        }
    }
}

/// Statistics page template.
#[derive(Template)]
#[template(path = "statistics/index.html")]
pub struct StatisticsTemplate {
    pub layout: Layout,
    pub from: String,
    pub to: String,
    /// Export link for the same period and search.
    pub export_href: String,
    pub totals: StatisticsTotals,
    pub table: DataTable<StatisticsRowView>,
}

/// Raw CSV fields of one statistics row.
fn export_fields(row: &CustomerStatistics) -> [String; 9] {
    let lead = row
        .average_lead_days
        .map(|d| d.round_dp(1).to_string())
        .unwrap_or_default();
    [
        row.customer_code.clone(),
        row.customer_name.clone(),
        row.order_count.to_string(),
        row.ordered_quantity.to_string(),
        row.delivered_quantity.to_string(),
        row.undelivered_quantity().to_string(),
        row.sales_amount.whole_yen().to_string(),
        row.delivered_amount.whole_yen().to_string(),
        lead,
    ]
}

/// Export link for the same period, search and sort. The export ignores `page`.
fn export_href(range: &DateRange, query: &ListQuery) -> String {
    let query = ListQuery {
        carry: range.params(),
        ..query.clone()
    };
    format!("/statistics/export{}", query.page_href(1))
}

/// Statistics page handler.
#[instrument(skip(store, state, session), fields(store_id = %store.id))]
pub async fn index(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    session: Session,
    Query(dates): Query<DateRangeQuery>,
    Query(mut query): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let range = DateRange::resolve(&dates, chrono::Local::now().date_naive());
    query.carry = range.params();

    let rows = StatisticsRepository::new(state.pool(), store.id)
        .per_customer(range)
        .await?;
    let totals = StatisticsTotals::new(&rows);
    let listing = query.apply(rows, state.config().page_size);

    let template = StatisticsTemplate {
        layout: Layout::for_store(&session, &store, "/statistics").await,
        from: range.from.to_string(),
        to: range.to.to_string(),
        export_href: export_href(&range, &query),
        totals,
        table: statistics_table_config().build(&query, &listing, |row| StatisticsRowView::from(row)),
    };

    Ok(render(&template))
}

/// Statistics CSV download. Honours the period, search and sort of the page
/// but not its pagination.
#[instrument(skip(store, state), fields(store_id = %store.id))]
pub async fn export(
    RequireStore(store): RequireStore,
    State(state): State<AppState>,
    Query(dates): Query<DateRangeQuery>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let range = DateRange::resolve(&dates, chrono::Local::now().date_naive());
    let rows = StatisticsRepository::new(state.pool(), store.id)
        .per_customer(range)
        .await?;
    let rows = query.filter_sorted(rows);

    let exported = write_shift_jis_csv(EXPORT_HEADERS, rows.iter().map(export_fields))
        .map_err(|e| AppError::Internal(format!("statistics export: {e}")))?;
    if exported.replaced {
        tracing::warn!("Some characters could not be written as Shift_JIS and were replaced");
    }
    tracing::info!(rows = rows.len(), from = %range.from, to = %range.to, "Statistics exported");

    let filename = format!("statistics_{}_{}.csv", range.from, range.to);
    Ok(csv_download(&filename, exported.bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tradedesk_core::{CustomerId, Money};

    use super::*;

    fn stats(code: &str, ordered: i64, delivered: i64, lead: Option<Decimal>) -> CustomerStatistics {
        CustomerStatistics {
            customer_id: CustomerId::new(1),
            customer_code: code.to_string(),
            customer_name: "Sato".to_string(),
            order_count: 2,
            ordered_quantity: ordered,
            delivered_quantity: delivered,
            sales_amount: Money::from_yen(12_000),
            delivered_amount: Money::from_yen(9_000),
            average_lead_days: lead,
        }
    }

    #[test]
    fn test_export_fields() {
        let row = stats("C-1", 10, 7, Some(Decimal::new(2_333, 3)));
        let fields = export_fields(&row);
        assert_eq!(fields[0], "C-1");
        assert_eq!(fields[5], "3");
        assert_eq!(fields[6], "12000");
        assert_eq!(fields[8], "2.3");

        let fields = export_fields(&stats("C-2", 1, 0, None));
        assert_eq!(fields[8], "");
    }

    #[test]
    fn test_totals_cover_all_rows() {
        let rows = vec![stats("C-1", 10, 7, None), stats("C-2", 5, 5, None)];
        let totals = StatisticsTotals::new(&rows);
        assert_eq!(totals.customers, 2);
        assert_eq!(totals.order_count, 4);
        assert_eq!(totals.ordered, 15);
        assert_eq!(totals.delivered, 12);
        assert_eq!(totals.sales, Money::from_yen(24_000).to_string());
    }

    fn april() -> DateRange {
        DateRange {
            from: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
        }
    }

    #[test]
    fn test_export_href_keeps_period_and_search() {
        let query = ListQuery {
            q: Some(" 佐藤 ".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(
            export_href(&april(), &query),
            "/statistics/export?q=%E4%BD%90%E8%97%A4&page=1&from=2026-04-01&to=2026-04-30"
        );
    }

    #[test]
    fn test_export_href_keeps_sort() {
        let query = ListQuery {
            sort: Some("sales".to_string()),
            order: Some("desc".to_string()),
            page: Some("3".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(
            export_href(&april(), &query),
            "/statistics/export?sort=sales&order=desc&page=1&from=2026-04-01&to=2026-04-30"
        );
    }
}

//! Data table component types.
//!
//! A [`DataTableConfig`] describes the columns of a list page. Combined with
//! the request's [`ListQuery`] and a computed [`Listing`] it yields a
//! [`DataTable`] the templates render: header links that toggle sorting,
//! page rows padded to a fixed height, and the pager.

use serde::Serialize;

use tradedesk_core::listing::{ListQuery, Listable, Listing, SortField, SortOrder};

/// Column definition for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    /// Sort key of the column; matches a `SortField` key when sortable.
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    /// Whether the column is sortable.
    pub sortable: bool,
    /// Right-align the column (amounts and quantities).
    pub numeric: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub fn sortable(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: true,
            numeric: false,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: false,
            numeric: false,
        }
    }

    /// Right-align the column.
    #[must_use]
    pub const fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct DataTableConfig {
    /// Unique table identifier.
    pub table_id: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Search placeholder text.
    pub search_placeholder: String,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            columns: vec![],
            search_placeholder: "Search...".to_string(),
            empty_title: "No items found".to_string(),
            empty_description: None,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    /// Set empty state configuration.
    #[must_use]
    pub fn empty_state(mut self, title: &str, description: Option<&str>) -> Self {
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }

    /// Header cells for the current query.
    #[must_use]
    pub fn headers<F: SortField>(&self, query: &ListQuery) -> Vec<HeaderCell> {
        self.columns
            .iter()
            .map(|column| {
                let field = column
                    .sortable
                    .then(|| F::from_key(&column.key))
                    .flatten();
                let (href, indicator) = match field {
                    Some(field) if query.is_sorted_by(field) => (
                        Some(query.toggle_href(field)),
                        match query.sort_order() {
                            SortOrder::Asc => "▲",
                            SortOrder::Desc => "▼",
                        },
                    ),
                    Some(field) => (Some(query.toggle_href(field)), ""),
                    None => (None, ""),
                };
                HeaderCell {
                    label: column.label.clone(),
                    href,
                    indicator,
                    numeric: column.numeric,
                }
            })
            .collect()
    }

    /// Turn a computed page into a renderable table.
    ///
    /// `view` converts each real row; padding rows stay `None`.
    pub fn build<T, R>(
        &self,
        query: &ListQuery,
        listing: &Listing<T>,
        view: impl Fn(&T) -> R,
    ) -> DataTable<R>
    where
        T: Listable,
    {
        DataTable {
            config: self.clone(),
            headers: self.headers::<T::Field>(query),
            rows: listing.rows.iter().map(|row| row.as_ref().map(&view)).collect(),
            pager: PagerView::new(query, listing),
            search: query.search().unwrap_or_default().to_string(),
            carry: query.carry.clone(),
        }
    }
}

/// A column header as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub label: String,
    /// Link that sorts by this column; `None` for fixed columns.
    pub href: Option<String>,
    /// Arrow shown on the active sort column.
    pub indicator: &'static str,
    pub numeric: bool,
}

/// One numbered pager link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

/// Pager state for templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerView {
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub first_item: usize,
    pub last_item: usize,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub links: Vec<PageLink>,
}

impl PagerView {
    fn new<T>(query: &ListQuery, listing: &Listing<T>) -> Self {
        Self {
            page: listing.page,
            total_pages: listing.total_pages,
            total_items: listing.total_items,
            first_item: listing.first_item(),
            last_item: listing.last_item(),
            prev_href: listing
                .has_prev()
                .then(|| query.page_href(listing.prev_page())),
            next_href: listing
                .has_next()
                .then(|| query.page_href(listing.next_page())),
            links: listing
                .page_numbers()
                .into_iter()
                .map(|number| PageLink {
                    number,
                    href: query.page_href(number),
                    current: number == listing.page,
                })
                .collect(),
        }
    }
}

/// A list page ready to render.
#[derive(Debug, Clone)]
pub struct DataTable<R> {
    pub config: DataTableConfig,
    pub headers: Vec<HeaderCell>,
    /// Page rows; `None` rows are blank padding.
    pub rows: Vec<Option<R>>,
    pub pager: PagerView,
    /// Current search text for the search box.
    pub search: String,
    /// Extra parameters the search form resubmits as hidden fields.
    pub carry: Vec<(String, String)>,
}

impl<R> DataTable<R> {
    /// Number of columns, for blank rows and the empty state.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Whether the filtered list has no rows at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pager.total_items == 0
    }
}

/// Build the customers table configuration.
#[must_use]
pub fn customers_table_config() -> DataTableConfig {
    DataTableConfig::new("customers")
        .column(TableColumn::sortable("code", "Customer ID"))
        .column(TableColumn::sortable("name", "Name"))
        .column(TableColumn::sortable("contact_person", "Contact"))
        .column(TableColumn::sortable("address", "Address"))
        .column(TableColumn::sortable("phone", "Phone"))
        .column(TableColumn::sortable("updated_at", "Updated"))
        .search_placeholder("Search by ID, name, contact, address or phone...")
        .empty_state(
            "No customers found",
            Some("Try another search, or add or import customers"),
        )
}

/// Build the orders table configuration.
#[must_use]
pub fn orders_table_config() -> DataTableConfig {
    DataTableConfig::new("orders")
        .column(TableColumn::sortable("id", "No.").numeric())
        .column(TableColumn::sortable("order_date", "Order date"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::sortable("lines", "Lines").numeric())
        .column(TableColumn::sortable("total", "Total").numeric())
        .column(TableColumn::sortable("progress", "Delivery"))
        .search_placeholder("Search by customer or note...")
        .empty_state("No orders found", None)
}

/// Build the deliveries table configuration.
#[must_use]
pub fn deliveries_table_config() -> DataTableConfig {
    DataTableConfig::new("deliveries")
        .column(TableColumn::sortable("id", "No.").numeric())
        .column(TableColumn::sortable("delivery_date", "Delivery date"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::sortable("quantity", "Units").numeric())
        .column(TableColumn::sortable("total", "Value").numeric())
        .search_placeholder("Search by customer or note...")
        .empty_state("No deliveries found", None)
}

/// Build the statistics table configuration.
#[must_use]
pub fn statistics_table_config() -> DataTableConfig {
    DataTableConfig::new("statistics")
        .column(TableColumn::sortable("code", "Customer ID"))
        .column(TableColumn::sortable("name", "Name"))
        .column(TableColumn::sortable("orders", "Orders").numeric())
        .column(TableColumn::sortable("ordered", "Ordered").numeric())
        .column(TableColumn::sortable("delivered", "Delivered").numeric())
        .column(TableColumn::new("undelivered", "Open").numeric())
        .column(TableColumn::sortable("sales", "Sales").numeric())
        .column(TableColumn::sortable("delivered_amount", "Delivered value").numeric())
        .column(TableColumn::sortable("lead_time", "Lead time (days)").numeric())
        .search_placeholder("Search by customer ID or name...")
        .empty_state("No orders in this period", None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use tradedesk_core::listing::SortKey;
    use tradedesk_core::sort_fields;

    use super::*;

    sort_fields! {
        enum ItemField {
            Name => "name",
            Qty => "qty",
        }
    }

    struct Item(&'static str, i64);

    impl Listable for Item {
        type Field = ItemField;

        fn search_text(&self) -> Vec<&str> {
            vec![self.0]
        }

        fn sort_key(&self, field: ItemField) -> SortKey {
            match field {
                ItemField::Name => SortKey::text(self.0),
                ItemField::Qty => SortKey::Int(self.1),
            }
        }
    }

    fn config() -> DataTableConfig {
        DataTableConfig::new("items")
            .column(TableColumn::sortable("name", "Name"))
            .column(TableColumn::sortable("qty", "Qty").numeric())
            .column(TableColumn::new("note", "Note"))
    }

    fn query(sort: &str, order: &str) -> ListQuery {
        ListQuery {
            sort: Some(sort.to_string()),
            order: Some(order.to_string()),
            ..ListQuery::default()
        }
    }

    #[test]
    fn test_headers_mark_active_column() {
        let headers = config().headers::<ItemField>(&query("qty", "desc"));
        assert_eq!(headers[0].indicator, "");
        assert_eq!(headers[1].indicator, "▼");
        assert_eq!(
            headers[1].href.as_deref(),
            Some("?sort=qty&order=asc&page=1")
        );
        assert_eq!(headers[2].href, None);
        assert!(headers[1].numeric);
    }

    #[test]
    fn test_build_pads_rows_and_links_pages() {
        let items = vec![Item("a", 1), Item("b", 2), Item("c", 3)];
        let q = ListQuery::default();
        let listing = q.apply(items, 2);
        let table = config().build(&q, &listing, |item| item.0.to_uppercase());

        assert_eq!(table.rows, vec![Some("A".to_string()), Some("B".to_string())]);
        assert_eq!(table.pager.total_pages, 2);
        assert_eq!(table.pager.prev_href, None);
        assert_eq!(table.pager.next_href.as_deref(), Some("?page=2"));
        assert!(table.pager.links[0].current);
        assert_eq!(table.column_count(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_config_columns_match_sort_fields() {
        use crate::models::{CustomerField, DeliveryField, OrderField, StatisticsField};

        fn check<F: SortField>(config: &DataTableConfig) {
            for column in config.columns.iter().filter(|c| c.sortable) {
                assert!(
                    F::from_key(&column.key).is_some(),
                    "{}: unknown sort key {}",
                    config.table_id,
                    column.key
                );
            }
        }

        check::<CustomerField>(&customers_table_config());
        check::<OrderField>(&orders_table_config());
        check::<DeliveryField>(&deliveries_table_config());
        check::<StatisticsField>(&statistics_table_config());
    }
}

//! Search, sort and pagination for list pages.
//!
//! Every list page works the same way: the store-scoped rows are loaded, then
//! filtered by a substring search, sorted by one column and sliced into a
//! fixed-size page. Pages are padded with blank rows so tables keep a stable
//! height, and the requested page number is always clamped into range.
//!
//! ```
//! use tradedesk_core::listing::{ListQuery, Listable, SortKey};
//! use tradedesk_core::sort_fields;
//!
//! sort_fields! {
//!     pub enum FruitField {
//!         Name => "name",
//!     }
//! }
//!
//! struct Fruit(&'static str);
//!
//! impl Listable for Fruit {
//!     type Field = FruitField;
//!
//!     fn search_text(&self) -> Vec<&str> {
//!         vec![self.0]
//!     }
//!
//!     fn sort_key(&self, _field: FruitField) -> SortKey {
//!         SortKey::text(self.0)
//!     }
//! }
//!
//! let query = ListQuery {
//!     q: Some("an".to_string()),
//!     sort: Some("name".to_string()),
//!     ..ListQuery::default()
//! };
//! let listing = query.apply(vec![Fruit("mango"), Fruit("apple"), Fruit("banana")], 5);
//!
//! assert_eq!(listing.total_items, 2);
//! assert_eq!(listing.rows.len(), 5);
//! assert_eq!(listing.rows[0].as_ref().map(|f| f.0), Some("banana"));
//! ```

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of page links shown around the current page.
const PAGE_WINDOW: usize = 7;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// The opposite direction.
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse a query-string value; anything but `desc` is ascending.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

/// A sortable column of some list page.
///
/// Implemented through [`sort_fields!`](crate::sort_fields).
pub trait SortField: Copy + PartialEq + 'static {
    /// The query-string key of this column.
    fn key(self) -> &'static str;

    /// Look up a column by its query-string key.
    fn from_key(key: &str) -> Option<Self>;
}

/// Define an enum of sortable columns with their query-string keys.
///
/// # Example
///
/// ```rust
/// use tradedesk_core::listing::SortField;
/// use tradedesk_core::sort_fields;
///
/// sort_fields! {
///     pub enum ProductField {
///         Name => "name",
///         Price => "price",
///     }
/// }
///
/// assert_eq!(ProductField::from_key("price"), Some(ProductField::Price));
/// assert_eq!(ProductField::Name.key(), "name");
/// assert_eq!(ProductField::from_key("colour"), None);
/// ```
#[macro_export]
macro_rules! sort_fields {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $key:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::listing::SortField for $name {
            fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// A value a row exposes for sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// Compared case-insensitively.
    Text(String),
    Int(i64),
    Amount(Decimal),
    Date(NaiveDate),
    /// Missing value; always sorts after everything else.
    Empty,
}

impl SortKey {
    /// Text key; blank text becomes [`SortKey::Empty`].
    #[must_use]
    pub fn text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_lowercase())
        }
    }

    /// Optional text key.
    #[must_use]
    pub fn opt_text(s: Option<&str>) -> Self {
        s.map_or(Self::Empty, Self::text)
    }

    /// Optional date key.
    #[must_use]
    pub fn opt_date(date: Option<NaiveDate>) -> Self {
        date.map_or(Self::Empty, Self::Date)
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Text(_) => 0,
            Self::Int(_) => 1,
            Self::Amount(_) => 2,
            Self::Date(_) => 3,
            Self::Empty => 4,
        }
    }

    /// Compare two keys in the given direction, keeping empties last.
    #[must_use]
    pub fn compare(&self, other: &Self, order: SortOrder) -> Ordering {
        let ordering = match (self, other) {
            (Self::Empty, Self::Empty) => return Ordering::Equal,
            (Self::Empty, _) => return Ordering::Greater,
            (_, Self::Empty) => return Ordering::Less,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Amount(a), Self::Amount(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        };

        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// A row that can be searched and sorted on a list page.
pub trait Listable {
    /// The sortable columns.
    type Field: SortField;

    /// Text the substring search looks at.
    fn search_text(&self) -> Vec<&str>;

    /// The sort value for a column.
    fn sort_key(&self, field: Self::Field) -> SortKey;

    /// Whether this row matches an already lowercased search needle.
    fn matches(&self, needle: &str) -> bool {
        self.search_text()
            .iter()
            .any(|text| text.to_lowercase().contains(needle))
    }
}

/// Keep rows matching `query` (trimmed, case-insensitive substring match).
///
/// An empty query keeps every row.
#[must_use]
pub fn filter_items<T: Listable>(items: Vec<T>, query: &str) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.matches(&needle))
        .collect()
}

/// Stable sort of rows by one column.
pub fn sort_items<T: Listable>(items: &mut [T], field: T::Field, order: SortOrder) {
    items.sort_by(|a, b| a.sort_key(field).compare(&b.sort_key(field), order));
}

/// One page of a list.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    /// Rows of the page, padded with `None` up to the page size.
    pub rows: Vec<Option<T>>,
    /// Current page (1-based, always within `1..=total_pages`).
    pub page: usize,
    /// Number of pages; at least 1 even for an empty list.
    pub total_pages: usize,
    /// Number of rows after filtering.
    pub total_items: usize,
    /// Rows per page.
    pub page_size: usize,
}

impl<T> Listing<T> {
    /// Whether there is a previous page.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether there is a next page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Previous page number (the first page stays on itself).
    #[must_use]
    pub fn prev_page(&self) -> usize {
        self.page.saturating_sub(1).max(1)
    }

    /// Next page number (the last page stays on itself).
    #[must_use]
    pub fn next_page(&self) -> usize {
        (self.page + 1).min(self.total_pages)
    }

    /// 1-based number of the first row on this page, 0 when empty.
    #[must_use]
    pub const fn first_item(&self) -> usize {
        if self.total_items == 0 {
            0
        } else {
            (self.page - 1) * self.page_size + 1
        }
    }

    /// 1-based number of the last row on this page, 0 when empty.
    #[must_use]
    pub fn last_item(&self) -> usize {
        (self.page * self.page_size).min(self.total_items)
    }

    /// Page numbers to link to, centred on the current page.
    #[must_use]
    pub fn page_numbers(&self) -> Vec<usize> {
        let half = PAGE_WINDOW / 2;
        let start = if self.total_pages <= PAGE_WINDOW {
            1
        } else {
            self.page
                .saturating_sub(half)
                .clamp(1, self.total_pages - PAGE_WINDOW + 1)
        };
        let end = (start + PAGE_WINDOW - 1).min(self.total_pages);
        (start..=end).collect()
    }

    /// Real (non-padding) rows on this page.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().flatten()
    }
}

/// Slice rows into a page, clamping the page number and padding blank rows.
///
/// A `page_size` of 0 is treated as 1.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Listing<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let mut rows: Vec<Option<T>> = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(Some)
        .collect();
    rows.resize_with(page_size, || None);

    Listing {
        rows,
        page,
        total_pages,
        total_items,
        page_size,
    }
}

/// List parameters as they arrive in the query string.
///
/// All fields are kept as raw strings so that malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Search text.
    pub q: Option<String>,
    /// Sort column key.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub order: Option<String>,
    /// Requested page (1-based).
    pub page: Option<String>,
    /// Extra parameters carried over into generated links (e.g. date filters).
    #[serde(skip)]
    pub carry: Vec<(String, String)>,
}

impl ListQuery {
    /// Trimmed, non-empty search text.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Requested sort column, if it names a known column.
    #[must_use]
    pub fn sort_field<F: SortField>(&self) -> Option<F> {
        self.sort.as_deref().and_then(|key| F::from_key(key.trim()))
    }

    /// Requested sort direction.
    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        self.order.as_deref().map_or(SortOrder::Asc, SortOrder::parse)
    }

    /// Requested page; missing, zero or malformed values mean page 1.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .max(1)
    }

    /// Filter and sort rows without paginating (downloads).
    #[must_use]
    pub fn filter_sorted<T: Listable>(&self, items: Vec<T>) -> Vec<T> {
        let mut items = filter_items(items, self.search().unwrap_or(""));
        if let Some(field) = self.sort_field::<T::Field>() {
            sort_items(&mut items, field, self.sort_order());
        }
        items
    }

    /// Filter, sort and paginate rows.
    #[must_use]
    pub fn apply<T: Listable>(&self, items: Vec<T>, page_size: usize) -> Listing<T> {
        paginate(self.filter_sorted(items), self.page(), page_size)
    }

    /// Whether the list is currently sorted by `field`.
    #[must_use]
    pub fn is_sorted_by<F: SortField>(&self, field: F) -> bool {
        self.sort_field::<F>() == Some(field)
    }

    /// Query string for a column header link.
    ///
    /// Clicking the active column flips its direction; another column starts
    /// ascending. The page resets to 1 and the search text is kept.
    #[must_use]
    pub fn toggle_href<F: SortField>(&self, field: F) -> String {
        let order = if self.is_sorted_by(field) {
            self.sort_order().toggle()
        } else {
            SortOrder::Asc
        };
        self.href(Some(field.key()), order, 1)
    }

    /// Query string for a pager link, keeping search and sort.
    #[must_use]
    pub fn page_href(&self, page: usize) -> String {
        let sort = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty());
        self.href(sort, self.sort_order(), page)
    }

    fn href(&self, sort: Option<&str>, order: SortOrder, page: usize) -> String {
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(q) = self.search() {
            params.push(("q".to_string(), q.to_string()));
        }
        if let Some(sort) = sort {
            params.push(("sort".to_string(), sort.to_string()));
            params.push(("order".to_string(), order.as_str().to_string()));
        }
        params.push(("page".to_string(), page.to_string()));
        params.extend(self.carry.iter().cloned());

        let encoded: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    sort_fields! {
        enum RowField {
            Name => "name",
            Qty => "qty",
            Due => "due",
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        city: &'static str,
        qty: i64,
        due: Option<NaiveDate>,
    }

    impl Listable for Row {
        type Field = RowField;

        fn search_text(&self) -> Vec<&str> {
            vec![self.name, self.city]
        }

        fn sort_key(&self, field: RowField) -> SortKey {
            match field {
                RowField::Name => SortKey::text(self.name),
                RowField::Qty => SortKey::Int(self.qty),
                RowField::Due => SortKey::opt_date(self.due),
            }
        }
    }

    fn row(name: &'static str, city: &'static str, qty: i64, due: Option<(i32, u32, u32)>) -> Row {
        Row {
            name,
            city,
            qty,
            due: due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            row("Sato Shoten", "Osaka", 5, Some((2026, 3, 1))),
            row("aoki foods", "Tokyo", 12, None),
            row("Kato Mart", "Tokyo", 1, Some((2026, 1, 15))),
        ]
    }

    fn names(listing: &Listing<Row>) -> Vec<&'static str> {
        listing.items().map(|r| r.name).collect()
    }

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let mut q = ListQuery::default();
        for (k, v) in pairs {
            let v = Some((*v).to_string());
            match *k {
                "q" => q.q = v,
                "sort" => q.sort = v,
                "order" => q.order = v,
                "page" => q.page = v,
                _ => {}
            }
        }
        q
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let listing = query(&[("q", "TOKYO")]).apply(rows(), 10);
        assert_eq!(names(&listing), vec!["aoki foods", "Kato Mart"]);
    }

    #[test]
    fn test_blank_query_keeps_everything() {
        let listing = query(&[("q", "   ")]).apply(rows(), 10);
        assert_eq!(listing.total_items, 3);
    }

    #[test]
    fn test_no_sort_keeps_input_order() {
        let listing = ListQuery::default().apply(rows(), 10);
        assert_eq!(names(&listing), vec!["Sato Shoten", "aoki foods", "Kato Mart"]);
    }

    #[test]
    fn test_sort_text_ignores_case() {
        let listing = query(&[("sort", "name")]).apply(rows(), 10);
        assert_eq!(names(&listing), vec!["aoki foods", "Kato Mart", "Sato Shoten"]);
    }

    #[test]
    fn test_sort_desc() {
        let listing = query(&[("sort", "qty"), ("order", "desc")]).apply(rows(), 10);
        assert_eq!(names(&listing), vec!["aoki foods", "Sato Shoten", "Kato Mart"]);
    }

    #[test]
    fn test_empty_sorts_last_in_both_directions() {
        let asc = query(&[("sort", "due")]).apply(rows(), 10);
        assert_eq!(names(&asc).last(), Some(&"aoki foods"));

        let desc = query(&[("sort", "due"), ("order", "desc")]).apply(rows(), 10);
        assert_eq!(names(&desc), vec!["Sato Shoten", "Kato Mart", "aoki foods"]);
    }

    #[test]
    fn test_unknown_sort_field_is_ignored() {
        let listing = query(&[("sort", "colour")]).apply(rows(), 10);
        assert_eq!(names(&listing), vec!["Sato Shoten", "aoki foods", "Kato Mart"]);
    }

    #[test]
    fn test_pages_are_padded_with_blank_rows() {
        let listing = paginate(vec![1, 2, 3], 1, 5);
        assert_eq!(listing.rows, vec![Some(1), Some(2), Some(3), None, None]);
    }

    #[test]
    fn test_empty_list_has_one_blank_page() {
        let listing = paginate(Vec::<i32>::new(), 4, 3);
        assert_eq!(listing.page, 1);
        assert_eq!(listing.total_pages, 1);
        assert_eq!(listing.rows, vec![None, None, None]);
        assert_eq!(listing.first_item(), 0);
        assert_eq!(listing.last_item(), 0);
    }

    #[test]
    fn test_page_is_clamped_into_range() {
        let items: Vec<i32> = (1..=7).collect();
        let last = paginate(items.clone(), 99, 3);
        assert_eq!(last.page, 3);
        assert_eq!(last.rows, vec![Some(7), None, None]);

        let first = paginate(items, 0, 3);
        assert_eq!(first.page, 1);
        assert_eq!(first.rows, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_malformed_page_falls_back_to_first() {
        assert_eq!(query(&[("page", "abc")]).page(), 1);
        assert_eq!(query(&[("page", "-2")]).page(), 1);
        assert_eq!(query(&[("page", " 3 ")]).page(), 3);
    }

    #[test]
    fn test_zero_page_size_is_treated_as_one() {
        let listing = paginate(vec![1, 2], 2, 0);
        assert_eq!(listing.page_size, 1);
        assert_eq!(listing.rows, vec![Some(2)]);
    }

    #[test]
    fn test_prev_next_stay_in_range() {
        let listing = paginate((1..=10).collect::<Vec<_>>(), 1, 5);
        assert!(!listing.has_prev());
        assert!(listing.has_next());
        assert_eq!(listing.prev_page(), 1);
        assert_eq!(listing.next_page(), 2);

        let listing = paginate((1..=10).collect::<Vec<_>>(), 2, 5);
        assert!(!listing.has_next());
        assert_eq!(listing.next_page(), 2);
        assert_eq!(listing.first_item(), 6);
        assert_eq!(listing.last_item(), 10);
    }

    #[test]
    fn test_page_numbers_window() {
        let listing = paginate((1..=100).collect::<Vec<_>>(), 1, 10);
        assert_eq!(listing.page_numbers(), vec![1, 2, 3, 4, 5, 6, 7]);

        let listing = paginate((1..=100).collect::<Vec<_>>(), 6, 10);
        assert_eq!(listing.page_numbers(), vec![3, 4, 5, 6, 7, 8, 9]);

        let listing = paginate((1..=100).collect::<Vec<_>>(), 10, 10);
        assert_eq!(listing.page_numbers(), vec![4, 5, 6, 7, 8, 9, 10]);

        let listing = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(listing.page_numbers(), vec![1, 2, 3]);
    }

    #[test]
    fn test_toggle_href_flips_active_column() {
        let q = query(&[("q", "kato mart"), ("sort", "name"), ("page", "3")]);
        assert_eq!(
            q.toggle_href(RowField::Name),
            "?q=kato%20mart&sort=name&order=desc&page=1"
        );
    }

    #[test]
    fn test_toggle_href_new_column_starts_ascending() {
        let q = query(&[("sort", "name"), ("order", "desc")]);
        assert_eq!(q.toggle_href(RowField::Qty), "?sort=qty&order=asc&page=1");
    }

    #[test]
    fn test_page_href_keeps_sort_and_carry() {
        let mut q = query(&[("sort", "qty"), ("order", "desc")]);
        q.carry.push(("from".to_string(), "2026-01-01".to_string()));
        assert_eq!(
            q.page_href(2),
            "?sort=qty&order=desc&page=2&from=2026-01-01"
        );
    }
}

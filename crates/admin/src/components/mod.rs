//! Reusable view components.

pub mod data_table;

pub use data_table::{DataTable, DataTableConfig, HeaderCell, PageLink, PagerView, TableColumn};

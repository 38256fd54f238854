//! Domain models for admin.
//!
//! Repositories return these types; handlers turn them into template views.

pub mod customer;
pub mod delivery;
pub mod order;
pub mod session;
pub mod statistics;
pub mod store;

pub use customer::{Customer, CustomerField, CustomerOption, ImportOutcome};
pub use delivery::{Delivery, DeliveryDetail, DeliveryField, DeliverySummary, OpenOrderDetail};
pub use order::{Order, OrderDetail, OrderField, OrderSummary};
pub use session::{CurrentStore, keys as session_keys};
pub use statistics::{CustomerStatistics, DateRange, DateRangeQuery, StatisticsField};
pub use store::{Store, StoreCounts};

//! Status enums derived from order and delivery quantities.

use serde::{Deserialize, Serialize};

/// How much of an order (or an order line) has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryProgress {
    #[default]
    Undelivered,
    PartiallyDelivered,
    Delivered,
}

impl DeliveryProgress {
    /// Derive the progress from ordered and delivered quantities.
    ///
    /// Nothing ordered counts as delivered; there is nothing left to ship.
    #[must_use]
    pub const fn from_quantities(ordered: i64, delivered: i64) -> Self {
        if delivered >= ordered {
            Self::Delivered
        } else if delivered <= 0 {
            Self::Undelivered
        } else {
            Self::PartiallyDelivered
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Undelivered => "Undelivered",
            Self::PartiallyDelivered => "Partially delivered",
            Self::Delivered => "Delivered",
        }
    }

    /// CSS badge class used by the list and detail pages.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Undelivered => "badge badge-warning",
            Self::PartiallyDelivered => "badge badge-info",
            Self::Delivered => "badge badge-success",
        }
    }
}

impl std::fmt::Display for DeliveryProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

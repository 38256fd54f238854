//! Delivery allocation rules.
//!
//! A delivery allocates quantities from order lines. For every order line the
//! delivered total may never exceed the ordered quantity.

/// Errors raised when a requested delivery quantity cannot be allocated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// Zero or negative quantity.
    #[error("delivery quantity must be positive")]
    NonPositive,
    /// More than what is left on the order line.
    #[error("only {remaining} left to deliver, {requested} requested")]
    ExceedsRemaining {
        /// Quantity still undelivered.
        remaining: i64,
        /// Quantity asked for.
        requested: i64,
    },
}

/// Quantity still to deliver on an order line. Never negative.
#[must_use]
pub fn remaining(ordered: i64, delivered: i64) -> i64 {
    (ordered - delivered).max(0)
}

/// Check that `requested` more units can be delivered on an order line.
///
/// Returns the quantity left after the allocation.
///
/// # Errors
///
/// Returns [`AllocationError::NonPositive`] for a quantity below 1 and
/// [`AllocationError::ExceedsRemaining`] when the line does not have enough
/// left.
///
/// ```
/// use tradedesk_core::allocation::{check, AllocationError};
///
/// assert_eq!(check(10, 4, 6), Ok(0));
/// assert_eq!(
///     check(10, 4, 7),
///     Err(AllocationError::ExceedsRemaining { remaining: 6, requested: 7 })
/// );
/// ```
pub fn check(ordered: i64, delivered: i64, requested: i64) -> Result<i64, AllocationError> {
    if requested <= 0 {
        return Err(AllocationError::NonPositive);
    }
    let remaining = remaining(ordered, delivered);
    if requested > remaining {
        return Err(AllocationError::ExceedsRemaining {
            remaining,
            requested,
        });
    }
    Ok(remaining - requested)
}

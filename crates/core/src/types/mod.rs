//! Core types for Tradedesk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod id;
pub mod money;
pub mod phone;
pub mod status;

pub use code::{CustomerCode, CustomerCodeError};
pub use id::*;
pub use money::Money;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use status::*;

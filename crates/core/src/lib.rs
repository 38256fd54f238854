//! Tradedesk Core - shared domain library.
//!
//! This crate holds the parts of the sales back office that need no I/O:
//! - `admin` - the web application that stores and serves this data
//! - `cli` - command-line tools for migrations, stores and CSV transfer
//!
//! # Architecture
//!
//! No database access and no HTTP here. Database traits for the ID types are
//! behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, customer codes, phone numbers, money and delivery progress
//! - [`listing`] - Search, sort and pagination of in-memory lists
//! - [`forms`] - Form validation into typed drafts
//! - [`allocation`] - Delivery quantity rules
//! - [`customer_csv`] - Shift_JIS customer import and export

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocation;
pub mod customer_csv;
pub mod forms;
pub mod listing;
pub mod types;

pub use types::*;

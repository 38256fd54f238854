//! Tradedesk Admin library.
//!
//! The back-office web application as a library, so the binary and the
//! integration tests build the same router.
//!
//! Every page works inside a store chosen per session. Customers, orders
//! and deliveries are stored in the `sales` schema of `PostgreSQL`; customers
//! can be moved in and out as Shift_JIS CSV.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

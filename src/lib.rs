//! paydesk - payroll contribution records and a Stripe payment proxy
//!
//! This library provides the record store, CSV import, PDF reports, token
//! authentication and the HTTP handlers behind the staff dashboard.

pub mod config;
pub mod crypto;
pub mod csv_import;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod pdf;
pub mod util;

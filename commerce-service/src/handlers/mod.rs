//! HTTP handlers for commerce-service.

pub mod invoices;
pub mod products;
pub mod users;

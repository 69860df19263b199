//! Services module for commerce-service.

pub mod access;
pub mod database;
pub mod error;
pub mod invoice_builder;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use error::CommerceError;
pub use invoice_builder::build_invoice;
pub use jwt::JwtService;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use store::{CatalogStore, CommerceStore, InvoiceRepository, UserDirectory};

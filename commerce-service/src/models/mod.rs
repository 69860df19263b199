//! Domain models for commerce-service.

mod invoice;
pub mod money;
mod principal;
mod product;
mod user;

pub use invoice::{total_of, DraftLine, Invoice, InvoiceDetail, InvoiceDraft, RequestedItem};
pub use principal::{Principal, Role};
pub use product::{NewProduct, Product, ProductChanges};
pub use user::User;

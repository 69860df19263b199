//! Request and response bodies. JSON field names are camelCase.

pub mod invoice;
pub mod product;
pub mod user;

pub use invoice::{InvoiceItemRequest, InvoiceItemResponse, InvoiceRequest, InvoiceResponse};
pub use product::{
    CreateProductRequest, PageQuery, ProductPage, ProductResponse, UpdateProductRequest,
};
pub use user::UserResponse;

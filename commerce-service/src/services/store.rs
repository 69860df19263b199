//! Persistence seams for the catalog, invoices and users.
//!
//! `Database` implements these over Postgres; `InMemoryStore` implements them
//! for tests and local runs.

use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;

use crate::dtos::InvoiceResponse;
use crate::services::CommerceError;
use crate::models::{
    DraftLine, Invoice, InvoiceDraft, NewProduct, Product, ProductChanges, User,
};

/// Rows to skip for a 1-based `page`. Pages below 1 read as the first page;
/// offsets that overflow are rejected.
pub fn page_offset(page: i64, page_size: i64) -> Result<i64, CommerceError> {
    (page.max(1) - 1)
        .checked_mul(page_size.max(0))
        .ok_or_else(|| CommerceError::Validation("page is out of range".into()))
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the product only while it is not soft-deleted.
    async fn find_active(&self, product_id: i64) -> Result<Option<Product>, AppError>;

    /// Active products ordered by id, plus the total active count.
    async fn list_products(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Product>, i64), AppError>;

    async fn create_product(&self, input: &NewProduct) -> Result<Product, AppError>;

    /// `None` when the product is missing or soft-deleted.
    async fn update_product(
        &self,
        product_id: i64,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, AppError>;

    /// Marks the product deleted. Returns `false` only if the id never existed.
    async fn soft_delete_product(&self, product_id: i64) -> Result<bool, AppError>;
}

/// Names used when projecting invoices for display.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    pub users: HashMap<String, String>,
    /// English names of active products only.
    pub products: HashMap<i64, String>,
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Persists the invoice and its details atomically.
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, AppError>;

    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>, AppError>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError>;

    async fn list_invoices_for_owner(&self, user_id: &str) -> Result<Vec<Invoice>, AppError>;

    /// Replaces every detail and recomputes the total in one unit of work.
    async fn replace_details(
        &self,
        invoice_id: i64,
        lines: &[DraftLine],
    ) -> Result<Option<Invoice>, AppError>;

    /// Removes the invoice and its details. `false` if it did not exist.
    async fn delete_invoice(&self, invoice_id: i64) -> Result<bool, AppError>;

    /// Resolves owner and product names referenced by `invoices`.
    async fn display_names(&self, invoices: &[Invoice]) -> Result<DisplayNames, AppError>;

    async fn project_for_display(&self, invoice: &Invoice) -> Result<InvoiceResponse, AppError> {
        let names = self.display_names(std::slice::from_ref(invoice)).await?;
        Ok(InvoiceResponse::project(invoice, &names))
    }

    async fn project_all(&self, invoices: &[Invoice]) -> Result<Vec<InvoiceResponse>, AppError> {
        let names = self.display_names(invoices).await?;
        Ok(invoices
            .iter()
            .map(|invoice| InvoiceResponse::project(invoice, &names))
            .collect())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}

/// Everything the HTTP layer needs from storage.
#[async_trait]
pub trait CommerceStore: CatalogStore + InvoiceRepository + UserDirectory {
    async fn health_check(&self) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_starts_at_zero() {
        assert_eq!(page_offset(1, 10).unwrap(), 0);
        assert_eq!(page_offset(3, 10).unwrap(), 20);
        assert_eq!(page_offset(0, 10).unwrap(), 0);
    }

    #[test]
    fn page_offset_overflow_is_rejected() {
        assert!(matches!(
            page_offset(i64::MAX, 100),
            Err(CommerceError::Validation(_))
        ));
    }
}

//! Invoice aggregate builder.
//!
//! Resolves requested items against the active catalog and prices them.
//! Nothing is persisted here; a failure leaves storage untouched.

use crate::models::{DraftLine, InvoiceDraft, RequestedItem};
use crate::services::metrics::ERRORS_TOTAL;
use crate::services::store::CatalogStore;
use crate::services::CommerceError;

/// Builds a draft owned by `owner_id` from `items`.
///
/// Quantities are checked before any lookup. Each product is then resolved in
/// request order; the first missing or soft-deleted one fails the whole build.
/// Duplicate product ids yield one line each.
pub async fn build_invoice<C>(
    catalog: &C,
    owner_id: &str,
    items: &[RequestedItem],
) -> Result<InvoiceDraft, CommerceError>
where
    C: CatalogStore + ?Sized,
{
    if let Some(bad) = items.iter().find(|item| item.quantity < 1) {
        return Err(CommerceError::Validation(format!(
            "quantity for product {} must be a positive integer",
            bad.product_id
        )));
    }

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = match catalog.find_active(item.product_id).await? {
            Some(product) => product,
            None => {
                let err = CommerceError::InvalidItem(item.product_id);
                ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                tracing::warn!(product_id = %item.product_id, "Invoice references unavailable product");
                return Err(err);
            }
        };

        lines.push(DraftLine {
            product_id: product.product_id,
            price: product.price,
            quantity: item.quantity,
        });
    }

    InvoiceDraft::new(owner_id, lines)
}

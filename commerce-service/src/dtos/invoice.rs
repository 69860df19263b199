use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Invoice, RequestedItem};
use crate::services::store::DisplayNames;

pub const DELETED_USER: &str = "Deleted User";
pub const DELETED_PRODUCT: &str = "Deleted Product";

/// Body of invoice create and update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "quantity must be a positive integer"))]
    pub quantity: i32,
}

impl InvoiceRequest {
    pub fn requested_items(&self) -> Vec<RequestedItem> {
        self.items
            .iter()
            .map(|item| RequestedItem {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub user_id: String,
    pub user_name: String,
    pub total_amount: Decimal,
    pub items: Vec<InvoiceItemResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemResponse {
    pub product_id: i64,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl InvoiceResponse {
    /// Maps a stored invoice to its API shape. Owners and products absent
    /// from `names` render as the deleted sentinels.
    pub fn project(invoice: &Invoice, names: &DisplayNames) -> Self {
        Self {
            id: invoice.invoice_id,
            date: invoice.invoice_date,
            user_id: invoice.user_id.clone(),
            user_name: names
                .users
                .get(&invoice.user_id)
                .cloned()
                .unwrap_or_else(|| DELETED_USER.to_string()),
            total_amount: invoice.total_amount,
            items: invoice
                .details
                .iter()
                .map(|d| InvoiceItemResponse {
                    product_id: d.product_id,
                    product_name: names
                        .products
                        .get(&d.product_id)
                        .cloned()
                        .unwrap_or_else(|| DELETED_PRODUCT.to_string()),
                    price: d.price,
                    quantity: d.quantity,
                })
                .collect(),
        }
    }
}

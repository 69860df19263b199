//! Invoice aggregate model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::money::{check_amount, line_amount};
use crate::services::CommerceError;

/// Stored invoice with its line items.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: i64,
    pub invoice_date: DateTime<Utc>,
    pub user_id: String,
    pub total_amount: Decimal,
    #[sqlx(skip)]
    pub details: Vec<InvoiceDetail>,
}

/// Line item. `price` is the catalog price captured when the line was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InvoiceDetail {
    pub detail_id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub price: Decimal,
    pub quantity: i32,
}

/// One `{product_id, quantity}` entry of an invoice write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedItem {
    pub product_id: i64,
    pub quantity: i32,
}

/// A priced line that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub product_id: i64,
    pub price: Decimal,
    pub quantity: i32,
}

impl DraftLine {
    pub fn line_total(&self) -> Result<Decimal, CommerceError> {
        line_amount(self.price, self.quantity)
    }
}

/// Unpersisted invoice produced by the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub user_id: String,
    pub lines: Vec<DraftLine>,
    pub total_amount: Decimal,
}

impl InvoiceDraft {
    /// The total is always derived from the lines.
    pub fn new(user_id: impl Into<String>, lines: Vec<DraftLine>) -> Result<Self, CommerceError> {
        let total_amount = total_of(&lines)?;
        Ok(Self {
            user_id: user_id.into(),
            lines,
            total_amount,
        })
    }
}

/// Sum of `price * quantity` over the given lines. Fails instead of
/// overflowing or exceeding the stored precision.
pub fn total_of(lines: &[DraftLine]) -> Result<Decimal, CommerceError> {
    let total = lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| CommerceError::Validation("invoice total is out of range".into()))
    })?;
    check_amount("invoice total", total)
}

//! Monetary limits shared by prices, line totals and invoice totals.
//!
//! Every amount is stored in a `NUMERIC(18,2)` column.

use rust_decimal::Decimal;

use crate::services::CommerceError;

pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(18,2)` column can hold.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_999_999, MONEY_SCALE)
}

/// Rejects amounts with more than two decimal places or above [`max_amount`].
pub fn check_amount(field: &str, amount: Decimal) -> Result<Decimal, CommerceError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(CommerceError::Validation(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    if amount > max_amount() {
        return Err(CommerceError::Validation(format!(
            "{} must not exceed {}",
            field,
            max_amount()
        )));
    }
    Ok(amount)
}

/// `price * quantity`, or a validation error when the product overflows.
pub fn line_amount(price: Decimal, quantity: i32) -> Result<Decimal, CommerceError> {
    let total = price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| CommerceError::Validation("line total is out of range".into()))?;
    check_amount("line total", total)
}

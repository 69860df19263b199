//! Catalog product model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::money::check_amount;
use crate::services::CommerceError;

/// Catalog product. Soft-deleted rows stay in storage so historical
/// invoice lines keep a valid `product_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: i64,
    pub arabic_name: String,
    pub english_name: String,
    pub price: Decimal,
    pub is_deleted: bool,
    pub created_utc: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub arabic_name: String,
    pub english_name: String,
    pub price: Decimal,
}

impl NewProduct {
    /// Names are trimmed and must be non-empty. Price is required, non-negative
    /// and fits a `NUMERIC(18,2)` column.
    pub fn new(
        arabic_name: &str,
        english_name: &str,
        price: Option<Decimal>,
    ) -> Result<Self, CommerceError> {
        let price = price.ok_or_else(|| CommerceError::Validation("price is required".into()))?;

        Ok(Self {
            arabic_name: required_name("arabicName", arabic_name)?,
            english_name: required_name("englishName", english_name)?,
            price: valid_price(price)?,
        })
    }
}

/// Validated partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub arabic_name: Option<String>,
    pub english_name: Option<String>,
    pub price: Option<Decimal>,
}

impl ProductChanges {
    pub fn new(
        arabic_name: Option<&str>,
        english_name: Option<&str>,
        price: Option<Decimal>,
    ) -> Result<Self, CommerceError> {
        Ok(Self {
            arabic_name: arabic_name
                .map(|n| required_name("arabicName", n))
                .transpose()?,
            english_name: english_name
                .map(|n| required_name("englishName", n))
                .transpose()?,
            price: price.map(valid_price).transpose()?,
        })
    }

    /// Applies the changes to a stored product.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.arabic_name {
            product.arabic_name = name.clone();
        }
        if let Some(name) = &self.english_name {
            product.english_name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
    }
}

fn required_name(field: &str, value: &str) -> Result<String, CommerceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommerceError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn valid_price(price: Decimal) -> Result<Decimal, CommerceError> {
    if price < Decimal::ZERO {
        return Err(CommerceError::Validation("price must not be negative".into()));
    }
    check_amount("price", price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn new_product_trims_names() {
        let product = NewProduct::new("  منتج  ", " Widget ", Some(dec(10))).unwrap();
        assert_eq!(product.arabic_name, "منتج");
        assert_eq!(product.english_name, "Widget");
    }

    #[test]
    fn new_product_rejects_blank_names() {
        assert!(matches!(
            NewProduct::new("   ", "Widget", Some(dec(1))),
            Err(CommerceError::Validation(_))
        ));
        assert!(matches!(
            NewProduct::new("منتج", "", Some(dec(1))),
            Err(CommerceError::Validation(_))
        ));
    }

    #[test]
    fn new_product_requires_non_negative_price() {
        assert!(matches!(
            NewProduct::new("منتج", "Widget", None),
            Err(CommerceError::Validation(_))
        ));
        assert!(matches!(
            NewProduct::new("منتج", "Widget", Some(dec(-1))),
            Err(CommerceError::Validation(_))
        ));
        assert!(NewProduct::new("منتج", "Widget", Some(Decimal::ZERO)).is_ok());
    }

    #[test]
    fn new_product_rejects_prices_outside_stored_precision() {
        let huge: Decimal = "10000000000000000000000000000".parse().unwrap();
        assert!(matches!(
            NewProduct::new("منتج", "Widget", Some(huge)),
            Err(CommerceError::Validation(_))
        ));
        assert!(matches!(
            NewProduct::new("منتج", "Widget", Some(Decimal::new(1001, 3))),
            Err(CommerceError::Validation(_))
        ));
        assert!(ProductChanges::new(None, None, Some(huge)).is_err());
    }

    #[test]
    fn changes_keep_absent_fields() {
        let mut product = Product {
            product_id: 1,
            arabic_name: "منتج 1".into(),
            english_name: "Product 1".into(),
            price: dec(55),
            is_deleted: false,
            created_utc: Utc::now(),
        };

        let changes = ProductChanges::new(None, Some("Renamed"), None).unwrap();
        changes.apply(&mut product);

        assert_eq!(product.arabic_name, "منتج 1");
        assert_eq!(product.english_name, "Renamed");
        assert_eq!(product.price, dec(55));
    }

    #[test]
    fn changes_validate_present_fields() {
        assert!(ProductChanges::new(Some(" "), None, None).is_err());
        assert!(ProductChanges::new(None, None, Some(dec(-5))).is_err());
    }
}

//! In-process store behind a single mutex.
//!
//! The lock is never held across an await, so every trait call is atomic.
//! Used by the test suites and for running the API without Postgres.

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{
    total_of, DraftLine, Invoice, InvoiceDetail, InvoiceDraft, NewProduct, Product,
    ProductChanges, User,
};
use crate::services::store::{
    page_offset, CatalogStore, CommerceStore, DisplayNames, InvoiceRepository, UserDirectory,
};

#[derive(Default)]
struct State {
    products: BTreeMap<i64, Product>,
    invoices: BTreeMap<i64, Invoice>,
    users: BTreeMap<String, User>,
    next_product_id: i64,
    next_invoice_id: i64,
    next_detail_id: i64,
}

impl State {
    fn detail_rows(&mut self, invoice_id: i64, lines: &[DraftLine]) -> Vec<InvoiceDetail> {
        lines
            .iter()
            .map(|line| {
                self.next_detail_id += 1;
                InvoiceDetail {
                    detail_id: self.next_detail_id,
                    invoice_id,
                    product_id: line.product_id,
                    price: line.price,
                    quantity: line.quantity,
                }
            })
            .collect()
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("In-memory store lock poisoned")))
    }

    pub fn insert_user(&self, user: User) -> Result<(), AppError> {
        self.lock()?.users.insert(user.user_id.clone(), user);
        Ok(())
    }

    pub fn remove_user(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.users.remove(user_id).is_some())
    }

    pub fn invoice_count(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.invoices.len())
    }

    /// Total line items across all invoices.
    pub fn detail_count(&self) -> Result<usize, AppError> {
        Ok(self
            .lock()?
            .invoices
            .values()
            .map(|invoice| invoice.details.len())
            .sum())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_active(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        Ok(self
            .lock()?
            .products
            .get(&product_id)
            .filter(|p| !p.is_deleted)
            .cloned())
    }

    async fn list_products(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let state = self.lock()?;
        let active: Vec<&Product> = state.products.values().filter(|p| !p.is_deleted).collect();
        let total = active.len() as i64;
        let offset = usize::try_from(page_offset(page, page_size)?).unwrap_or(usize::MAX);

        let items = active
            .into_iter()
            .skip(offset)
            .take(page_size.max(0) as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, AppError> {
        let mut state = self.lock()?;
        state.next_product_id += 1;
        let product = Product {
            product_id: state.next_product_id,
            arabic_name: input.arabic_name.clone(),
            english_name: input.english_name.clone(),
            price: input.price,
            is_deleted: false,
            created_utc: Utc::now(),
        };
        state.products.insert(product.product_id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: i64,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, AppError> {
        let mut state = self.lock()?;
        Ok(state
            .products
            .get_mut(&product_id)
            .filter(|p| !p.is_deleted)
            .map(|product| {
                changes.apply(product);
                product.clone()
            }))
    }

    async fn soft_delete_product(&self, product_id: i64) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        match state.products.get_mut(&product_id) {
            Some(product) => {
                product.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryStore {
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, AppError> {
        let mut state = self.lock()?;
        state.next_invoice_id += 1;
        let invoice_id = state.next_invoice_id;
        let details = state.detail_rows(invoice_id, &draft.lines);

        let invoice = Invoice {
            invoice_id,
            invoice_date: Utc::now(),
            user_id: draft.user_id.clone(),
            total_amount: draft.total_amount,
            details,
        };
        state.invoices.insert(invoice_id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock()?.invoices.get(&invoice_id).cloned())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        Ok(self.lock()?.invoices.values().cloned().collect())
    }

    async fn list_invoices_for_owner(&self, user_id: &str) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .lock()?
            .invoices
            .values()
            .filter(|invoice| invoice.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn replace_details(
        &self,
        invoice_id: i64,
        lines: &[DraftLine],
    ) -> Result<Option<Invoice>, AppError> {
        let mut state = self.lock()?;
        if !state.invoices.contains_key(&invoice_id) {
            return Ok(None);
        }

        let total = total_of(lines)?;
        let details = state.detail_rows(invoice_id, lines);

        Ok(state.invoices.get_mut(&invoice_id).map(|invoice| {
            invoice.details = details;
            invoice.total_amount = total;
            invoice.clone()
        }))
    }

    async fn delete_invoice(&self, invoice_id: i64) -> Result<bool, AppError> {
        Ok(self.lock()?.invoices.remove(&invoice_id).is_some())
    }

    async fn display_names(&self, invoices: &[Invoice]) -> Result<DisplayNames, AppError> {
        let state = self.lock()?;
        let mut names = DisplayNames::default();

        for invoice in invoices {
            if let Some(user) = state.users.get(&invoice.user_id) {
                names
                    .users
                    .insert(user.user_id.clone(), user.user_name.clone());
            }
            for detail in &invoice.details {
                if let Some(product) = state
                    .products
                    .get(&detail.product_id)
                    .filter(|p| !p.is_deleted)
                {
                    names
                        .products
                        .insert(product.product_id, product.english_name.clone());
                }
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    async fn store_with_products(prices: &[i64]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for (i, price) in prices.iter().enumerate() {
            let input = NewProduct::new(
                &format!("منتج {}", i + 1),
                &format!("Product {}", i + 1),
                Some(Decimal::from(*price)),
            )
            .unwrap();
            store.create_product(&input).await.unwrap();
        }
        store
    }

    fn line(product_id: i64, price: i64, quantity: i32) -> DraftLine {
        DraftLine {
            product_id,
            price: Decimal::from(price),
            quantity,
        }
    }

    #[tokio::test]
    async fn soft_delete_hides_product_from_catalog() {
        let store = store_with_products(&[55, 89, 10]).await;

        assert!(store.soft_delete_product(2).await.unwrap());

        assert!(store.find_active(2).await.unwrap().is_none());
        let (items, total) = store.list_products(1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            items.iter().map(|p| p.product_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[tokio::test]
    async fn soft_delete_is_idempotent_and_unknown_ids_report_missing() {
        let store = store_with_products(&[55]).await;

        assert!(store.soft_delete_product(1).await.unwrap());
        assert!(store.soft_delete_product(1).await.unwrap());
        assert!(!store.soft_delete_product(42).await.unwrap());
    }

    #[tokio::test]
    async fn pagination_counts_all_active_products() {
        let store = store_with_products(&[1, 2, 3, 4, 5]).await;

        let (items, total) = store.list_products(2, 2).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(
            items.iter().map(|p| p.product_id).collect::<Vec<_>>(),
            vec![3, 4]
        );

        let (items, total) = store.list_products(4, 2).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn update_of_deleted_product_is_not_found() {
        let store = store_with_products(&[55]).await;
        store.soft_delete_product(1).await.unwrap();

        let changes = ProductChanges::new(Some("x"), None, None).unwrap();
        assert!(store.update_product(1, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_details_recomputes_total() {
        let store = store_with_products(&[10, 20]).await;
        let created = store
            .create_invoice(
                &InvoiceDraft::new("u1", vec![line(1, 10, 1), line(2, 20, 3)]).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.total_amount, Decimal::from(70));

        let updated = store
            .replace_details(created.invoice_id, &[line(1, 10, 2)])
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.details.len(), 1);
        assert_eq!(updated.details[0].product_id, 1);
        assert_eq!(updated.details[0].quantity, 2);
        assert_eq!(updated.total_amount, Decimal::from(20));
        assert_eq!(updated.user_id, "u1");
        assert_eq!(updated.invoice_date, created.invoice_date);
    }

    #[tokio::test]
    async fn replace_details_on_missing_invoice_is_none() {
        let store = InMemoryStore::new();
        assert!(store.replace_details(9, &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_details() {
        let store = store_with_products(&[10]).await;
        let invoice = store
            .create_invoice(&InvoiceDraft::new("u1", vec![line(1, 10, 1)]).unwrap())
            .await
            .unwrap();
        assert_eq!(store.detail_count().unwrap(), 1);

        assert!(store.delete_invoice(invoice.invoice_id).await.unwrap());
        assert!(!store.delete_invoice(invoice.invoice_id).await.unwrap());

        assert_eq!(store.invoice_count().unwrap(), 0);
        assert_eq!(store.detail_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn list_for_owner_filters_by_user() {
        let store = InMemoryStore::new();
        store
            .create_invoice(&InvoiceDraft::new("u1", Vec::new()).unwrap())
            .await
            .unwrap();
        store
            .create_invoice(&InvoiceDraft::new("u2", Vec::new()).unwrap())
            .await
            .unwrap();

        let mine = store.list_invoices_for_owner("u1").await.unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "u1");
        assert_eq!(store.list_invoices().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn display_names_skip_deleted_products_and_users() {
        let store = store_with_products(&[10, 20]).await;
        store
            .insert_user(User {
                user_id: "u1".into(),
                user_name: "visitor1".into(),
                full_name: None,
                email: None,
            })
            .unwrap();
        let invoice = store
            .create_invoice(
                &InvoiceDraft::new("u1", vec![line(1, 10, 1), line(2, 20, 1)]).unwrap(),
            )
            .await
            .unwrap();
        store.soft_delete_product(2).await.unwrap();

        let names = store.display_names(&[invoice.clone()]).await.unwrap();
        assert_eq!(names.users.get("u1").map(String::as_str), Some("visitor1"));
        assert!(names.products.contains_key(&1));
        assert!(!names.products.contains_key(&2));

        store.remove_user("u1").unwrap();
        let response = store.project_for_display(&invoice).await.unwrap();
        assert_eq!(response.user_name, "Deleted User");
        assert_eq!(response.items[1].product_name, "Deleted Product");
        assert_eq!(response.items[1].price, Decimal::from(20));
    }
}

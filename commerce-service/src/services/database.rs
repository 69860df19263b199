//! Postgres store for commerce-service.

use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};

use crate::models::{
    total_of, DraftLine, Invoice, InvoiceDetail, InvoiceDraft, NewProduct, Product,
    ProductChanges, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{
    page_offset, CatalogStore, CommerceStore, DisplayNames, InvoiceRepository, UserDirectory,
};

const PRODUCT_COLUMNS: &str =
    "product_id, arabic_name, english_name, price, is_deleted, created_utc";
const INVOICE_COLUMNS: &str = "invoice_id, invoice_date, user_id, total_amount";
const DETAIL_COLUMNS: &str = "detail_id, invoice_id, product_id, price, quantity";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "commerce-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| db_error("Failed to connect", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Inserts the demo catalog when no product row exists at all.
    #[instrument(skip(self))]
    pub async fn seed_catalog_if_empty(&self) -> Result<(), AppError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count products", e))?;

        if existing > 0 {
            return Ok(());
        }

        for product in demo_catalog() {
            self.create_product(&product).await?;
        }

        info!("Seeded demo catalog");
        Ok(())
    }

    async fn load_details(&self, invoices: &mut [Invoice]) -> Result<(), AppError> {
        if invoices.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = invoices.iter().map(|i| i.invoice_id).collect();
        let details = sqlx::query_as::<_, InvoiceDetail>(&format!(
            "SELECT {} FROM invoice_details WHERE invoice_id = ANY($1) ORDER BY detail_id",
            DETAIL_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load invoice details", e))?;

        let mut by_invoice: HashMap<i64, Vec<InvoiceDetail>> = HashMap::new();
        for detail in details {
            by_invoice.entry(detail.invoice_id).or_default().push(detail);
        }
        for invoice in invoices.iter_mut() {
            invoice.details = by_invoice.remove(&invoice.invoice_id).unwrap_or_default();
        }

        Ok(())
    }
}

fn demo_catalog() -> Vec<NewProduct> {
    vec![
        NewProduct {
            arabic_name: "منتج 1".to_string(),
            english_name: "Product 1".to_string(),
            price: Decimal::from(55),
        },
        NewProduct {
            arabic_name: "منتج 2".to_string(),
            english_name: "Product 2".to_string(),
            price: Decimal::from(89),
        },
        NewProduct {
            arabic_name: "منتج 3".to_string(),
            english_name: "Product 3".to_string(),
            price: Decimal::from(10),
        },
    ]
}

async fn insert_details(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: i64,
    lines: &[DraftLine],
) -> Result<Vec<InvoiceDetail>, AppError> {
    let mut details = Vec::with_capacity(lines.len());
    for line in lines {
        let detail = sqlx::query_as::<_, InvoiceDetail>(&format!(
            r#"
            INSERT INTO invoice_details (invoice_id, product_id, price, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            DETAIL_COLUMNS
        ))
        .bind(invoice_id)
        .bind(line.product_id)
        .bind(line.price)
        .bind(line.quantity)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to insert invoice detail", e))?;
        details.push(detail);
    }
    Ok(details)
}

#[async_trait]
impl CatalogStore for Database {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn find_active(&self, product_id: i64) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE product_id = $1 AND is_deleted = FALSE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get product", e))?;

        timer.observe_duration();

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_products(
        &self,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Product>, i64), AppError> {
        let offset = page_offset(page, page_size)?;
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_products"])
            .start_timer();

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE is_deleted = FALSE
            ORDER BY product_id
            LIMIT $1 OFFSET $2
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list products", e))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_deleted = FALSE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count products", e))?;

        timer.observe_duration();

        Ok((products, total))
    }

    #[instrument(skip(self, input), fields(english_name = %input.english_name))]
    async fn create_product(&self, input: &NewProduct) -> Result<Product, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (arabic_name, english_name, price)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&input.arabic_name)
        .bind(&input.english_name)
        .bind(input.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create product", e))?;

        timer.observe_duration();

        info!(product_id = %product.product_id, "Product created");

        Ok(product)
    }

    #[instrument(skip(self, changes), fields(product_id = %product_id))]
    async fn update_product(
        &self,
        product_id: i64,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET arabic_name = COALESCE($2, arabic_name),
                english_name = COALESCE($3, english_name),
                price = COALESCE($4, price)
            WHERE product_id = $1 AND is_deleted = FALSE
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&changes.arabic_name)
        .bind(&changes.english_name)
        .bind(changes.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update product", e))?;

        timer.observe_duration();

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn soft_delete_product(&self, product_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["soft_delete_product"])
            .start_timer();

        let result = sqlx::query("UPDATE products SET is_deleted = TRUE WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete product", e))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InvoiceRepository for Database {
    #[instrument(skip(self, draft), fields(user_id = %draft.user_id, lines = draft.lines.len()))]
    async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let mut invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (user_id, total_amount)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(&draft.user_id)
        .bind(draft.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to create invoice", e))?;

        invoice.details = insert_details(&mut tx, invoice.invoice_id, &draft.lines).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE invoice_id = $1",
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get invoice", e))?;

        let mut invoices: Vec<Invoice> = invoice.into_iter().collect();
        self.load_details(&mut invoices).await?;

        timer.observe_duration();

        Ok(invoices.pop())
    }

    #[instrument(skip(self))]
    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let mut invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices ORDER BY invoice_id",
            INVOICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices", e))?;

        self.load_details(&mut invoices).await?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_invoices_for_owner(&self, user_id: &str) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices_for_owner"])
            .start_timer();

        let mut invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE user_id = $1 ORDER BY invoice_id",
            INVOICE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list invoices", e))?;

        self.load_details(&mut invoices).await?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self, lines), fields(invoice_id = %invoice_id, lines = lines.len()))]
    async fn replace_details(
        &self,
        invoice_id: i64,
        lines: &[DraftLine],
    ) -> Result<Option<Invoice>, AppError> {
        let total = total_of(lines)?;
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_invoice_details"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT invoice_id FROM invoices WHERE invoice_id = $1 FOR UPDATE")
                .bind(invoice_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to lock invoice", e))?;

        if locked.is_none() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM invoice_details WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to clear invoice details", e))?;

        let details = insert_details(&mut tx, invoice_id, lines).await?;

        let mut invoice = sqlx::query_as::<_, Invoice>(&format!(
            "UPDATE invoices SET total_amount = $2 WHERE invoice_id = $1 RETURNING {}",
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update invoice total", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        invoice.details = details;

        timer.observe_duration();

        Ok(Some(invoice))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn delete_invoice(&self, invoice_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        // invoice_details rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete invoice", e))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, invoices), fields(invoices = invoices.len()))]
    async fn display_names(&self, invoices: &[Invoice]) -> Result<DisplayNames, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["display_names"])
            .start_timer();

        let mut user_ids: Vec<String> = invoices.iter().map(|i| i.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();

        let mut product_ids: Vec<i64> = invoices
            .iter()
            .flat_map(|i| i.details.iter().map(|d| d.product_id))
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let users: Vec<(String, String)> =
            sqlx::query_as("SELECT user_id, user_name FROM users WHERE user_id = ANY($1)")
                .bind(&user_ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to resolve user names", e))?;

        let products: Vec<(i64, String)> = sqlx::query_as(
            "SELECT product_id, english_name FROM products WHERE product_id = ANY($1) AND is_deleted = FALSE",
        )
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to resolve product names", e))?;

        timer.observe_duration();

        Ok(DisplayNames {
            users: users.into_iter().collect(),
            products: products.into_iter().collect(),
        })
    }
}

#[async_trait]
impl UserDirectory for Database {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_users"])
            .start_timer();

        let users = sqlx::query_as::<_, User>(
            "SELECT user_id, user_name, full_name, email FROM users ORDER BY user_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))?;

        timer.observe_duration();

        Ok(users)
    }
}

#[async_trait]
impl CommerceStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Health check failed", e))?;
        Ok(())
    }
}

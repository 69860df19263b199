//! Common test utilities for commerce-service integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use commerce_service::config::{CommerceConfig, DatabaseConfig, JwtConfig};
use commerce_service::models::{NewProduct, User};
use commerce_service::services::{
    CatalogStore, CommerceStore, Database, InMemoryStore, JwtService,
};
use commerce_service::{build_router, AppState};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use tower::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,commerce_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const ADMIN_ID: &str = "admin-1";

pub struct TestApp<S = InMemoryStore> {
    pub router: Router,
    pub store: Arc<S>,
    pub jwt: JwtService,
}

pub fn test_config() -> CommerceConfig {
    CommerceConfig {
        common: CommonConfig::default(),
        service_name: "commerce-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret".to_string()),
            issuer: "commerce-auth".to_string(),
            audience: "commerce-api".to_string(),
            access_token_expiry_minutes: 5,
        },
        allowed_origins: vec!["http://localhost:3000".to_string()],
        seed_catalog: false,
    }
}

fn app_over<S: CommerceStore + 'static>(config: CommerceConfig, store: Arc<S>) -> TestApp<S> {
    let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");

    let state = AppState {
        config,
        store: store.clone(),
        jwt: jwt.clone(),
    };

    TestApp {
        router: build_router(state),
        store,
        jwt,
    }
}

/// Router over a fresh in-memory store.
pub fn spawn_app() -> TestApp {
    init_tracing();
    app_over(test_config(), Arc::new(InMemoryStore::new()))
}

/// Router over the Postgres store at `TEST_DATABASE_URL`, migrated.
///
/// The database is shared between tests, so callers use unique user ids and
/// only assert on rows they created.
pub async fn spawn_pg_app() -> TestApp<Database> {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run the Postgres tests");

    let mut config = test_config();
    config.database = DatabaseConfig {
        url: database_url,
        max_connections: 2,
        min_connections: 1,
    };

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");

    app_over(config, Arc::new(db))
}

/// Unique user id so tests sharing a database do not see each other's rows.
pub fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

impl<S: CatalogStore> TestApp<S> {
    pub fn token(&self, user_id: &str, role: &str) -> String {
        self.jwt
            .generate_access_token(user_id, user_id, role)
            .expect("Failed to generate token")
    }

    pub fn admin_token(&self) -> String {
        self.token(ADMIN_ID, "Admin")
    }

    pub async fn add_product(&self, english_name: &str, price: i64) -> i64 {
        self.add_product_priced(english_name, Decimal::from(price))
            .await
    }

    pub async fn add_product_priced(&self, english_name: &str, price: Decimal) -> i64 {
        let input = NewProduct::new(&format!("{} (ar)", english_name), english_name, Some(price))
            .expect("Invalid product");
        self.store
            .create_product(&input)
            .await
            .expect("Failed to create product")
            .product_id
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send_raw(method, uri, token, body.map(|json| json.to_string()))
            .await
    }

    /// Sends `body` verbatim as `application/json`, well-formed or not.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(text) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(text)),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }
}

impl TestApp<InMemoryStore> {
    /// Registers a visitor in the user directory and returns their token.
    pub fn visitor(&self, user_id: &str) -> String {
        self.store
            .insert_user(User {
                user_id: user_id.to_string(),
                user_name: format!("{}-name", user_id),
                full_name: None,
                email: Some(format!("{}@example.com", user_id)),
            })
            .expect("Failed to insert user");
        self.token(user_id, "Visitor")
    }
}

impl TestApp<Database> {
    /// Inserts a visitor row and returns their token.
    pub async fn visitor(&self, user_id: &str) -> String {
        sqlx::query("INSERT INTO users (user_id, user_name, email) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(format!("{}-name", user_id))
            .bind(format!("{}@example.com", user_id))
            .execute(self.store.pool())
            .await
            .expect("Failed to insert user");
        self.token(user_id, "Visitor")
    }

    pub async fn invoice_rows_for(&self, user_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.store.pool())
            .await
            .expect("Failed to count invoices")
    }

    pub async fn detail_rows_for(&self, invoice_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoice_details WHERE invoice_id = $1")
            .bind(invoice_id)
            .fetch_one(self.store.pool())
            .await
            .expect("Failed to count invoice details")
    }
}

/// Decimal fields serialize as strings.
pub fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("Invalid decimal string"),
        other => other.to_string().parse().expect("Invalid decimal"),
    }
}

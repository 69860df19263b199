//! Catalog administration. Every route requires the Admin role.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{CreateProductRequest, PageQuery, ProductPage, ProductResponse, UpdateProductRequest},
    middleware::Caller,
    models::{NewProduct, ProductChanges},
    services::access::{enforce, Action},
    services::{CatalogStore, CommerceError},
    AppState,
};

pub async fn list_products(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProductPage>, AppError> {
    enforce(caller.as_ref(), Action::ManageCatalog)?;
    query.validate()?;

    let (products, total_count) = state
        .store
        .list_products(query.page, query.page_size)
        .await?;

    Ok(Json(ProductPage {
        items: products.into_iter().map(ProductResponse::from).collect(),
        page: query.page,
        page_size: query.page_size,
        total_count,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(product_id): Path<i64>,
) -> Result<Json<ProductResponse>, AppError> {
    enforce(caller.as_ref(), Action::ManageCatalog)?;

    let product = state
        .store
        .find_active(product_id)
        .await?
        .ok_or_else(|| CommerceError::NotFound(format!("Product {}", product_id)))?;

    Ok(Json(ProductResponse::from(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    enforce(caller.as_ref(), Action::ManageCatalog)?;
    let Json(payload) = payload?;

    let input = NewProduct::new(&payload.arabic_name, &payload.english_name, payload.price)?;
    let product = state.store.create_product(&input).await?;

    tracing::info!(
        product_id = %product.product_id,
        price = %product.price,
        "Product created"
    );

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

pub async fn update_product(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(product_id): Path<i64>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    enforce(caller.as_ref(), Action::ManageCatalog)?;
    let Json(payload) = payload?;

    let changes = ProductChanges::new(
        payload.arabic_name.as_deref(),
        payload.english_name.as_deref(),
        payload.price,
    )?;

    let product = state
        .store
        .update_product(product_id, &changes)
        .await?
        .ok_or_else(|| CommerceError::NotFound(format!("Product {}", product_id)))?;

    tracing::info!(product_id = %product_id, "Product updated");

    Ok(Json(ProductResponse::from(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(product_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    enforce(caller.as_ref(), Action::ManageCatalog)?;

    if !state.store.soft_delete_product(product_id).await? {
        return Err(CommerceError::NotFound(format!("Product {}", product_id)).into());
    }

    tracing::info!(product_id = %product_id, "Product soft-deleted");

    Ok(StatusCode::NO_CONTENT)
}

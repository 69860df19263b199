//! Invoice endpoints.
//!
//! Reads by id resolve the invoice before the access guard runs, so callers
//! can tell a missing invoice (404) from someone else's (403). Write bodies are
//! decoded only after the caller passes the guard.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{InvoiceRequest, InvoiceResponse},
    middleware::Caller,
    services::access::{enforce, Action},
    services::metrics::{INVOICES_TOTAL, INVOICE_AMOUNT_TOTAL},
    services::{build_invoice, CommerceError, InvoiceRepository},
    AppState,
};

fn invoice_not_found(invoice_id: i64) -> CommerceError {
    CommerceError::NotFound(format!("Invoice {}", invoice_id))
}

/// All invoices (Admin).
pub async fn list_invoices(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    enforce(caller.as_ref(), Action::ListAllInvoices)?;

    let invoices = state.store.list_invoices().await?;
    let response = state.store.project_all(&invoices).await?;

    Ok(Json(response))
}

/// The caller's own invoices (Visitor).
pub async fn list_my_invoices(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    enforce(caller.as_ref(), Action::ListOwnInvoices)?;
    let Some(caller) = caller else {
        return Err(CommerceError::Unauthenticated.into());
    };

    let invoices = state.store.list_invoices_for_owner(&caller.user_id).await?;
    let response = state.store.project_all(&invoices).await?;

    Ok(Json(response))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(invoice_id): Path<i64>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let Some(caller) = caller else {
        return Err(CommerceError::Unauthenticated.into());
    };

    let invoice = state
        .store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| invoice_not_found(invoice_id))?;

    enforce(
        Some(&caller),
        Action::ReadInvoice {
            owner_id: &invoice.user_id,
        },
    )?;

    Ok(Json(state.store.project_for_display(&invoice).await?))
}

/// Creates an invoice owned by the caller (Visitor).
pub async fn create_invoice(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<InvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    enforce(caller.as_ref(), Action::CreateInvoice)?;
    let Some(caller) = caller else {
        return Err(CommerceError::Unauthenticated.into());
    };
    let Json(payload) = payload?;
    payload.validate()?;

    let draft = build_invoice(
        state.store.as_ref(),
        &caller.user_id,
        &payload.requested_items(),
    )
    .await?;

    let invoice = state.store.create_invoice(&draft).await?;

    INVOICES_TOTAL.with_label_values(&["created"]).inc();
    INVOICE_AMOUNT_TOTAL
        .with_label_values(&["created"])
        .inc_by(invoice.total_amount.to_f64().unwrap_or_default());

    tracing::info!(
        invoice_id = %invoice.invoice_id,
        user_id = %invoice.user_id,
        total_amount = %invoice.total_amount,
        lines = invoice.details.len(),
        "Invoice created"
    );

    let response = state.store.project_for_display(&invoice).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Replaces every line of an invoice (Admin). The owner never changes.
pub async fn update_invoice(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(invoice_id): Path<i64>,
    payload: Result<Json<InvoiceRequest>, JsonRejection>,
) -> Result<Json<InvoiceResponse>, AppError> {
    enforce(caller.as_ref(), Action::UpdateInvoice)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let existing = state
        .store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| invoice_not_found(invoice_id))?;

    let draft = build_invoice(
        state.store.as_ref(),
        &existing.user_id,
        &payload.requested_items(),
    )
    .await?;

    let invoice = state
        .store
        .replace_details(invoice_id, &draft.lines)
        .await?
        .ok_or_else(|| invoice_not_found(invoice_id))?;

    INVOICES_TOTAL.with_label_values(&["updated"]).inc();

    tracing::info!(
        invoice_id = %invoice.invoice_id,
        total_amount = %invoice.total_amount,
        lines = invoice.details.len(),
        "Invoice details replaced"
    );

    Ok(Json(state.store.project_for_display(&invoice).await?))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(invoice_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    enforce(caller.as_ref(), Action::DeleteInvoice)?;

    if !state.store.delete_invoice(invoice_id).await? {
        return Err(invoice_not_found(invoice_id).into());
    }

    INVOICES_TOTAL.with_label_values(&["deleted"]).inc();
    tracing::info!(invoice_id = %invoice_id, "Invoice deleted");

    Ok(StatusCode::NO_CONTENT)
}

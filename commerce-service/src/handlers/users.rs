use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::UserResponse,
    middleware::Caller,
    services::access::{enforce, Action},
    services::UserDirectory,
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    enforce(caller.as_ref(), Action::ListUsers)?;

    let users = state.store.list_users().await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Product with ID {0} not found or deleted")]
    InvalidItem(i64),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl CommerceError {
    /// Label used for the `commerce_errors_total` counter.
    pub fn kind(&self) -> &'static str {
        match self {
            CommerceError::NotFound(_) => "not_found",
            CommerceError::Forbidden(_) => "forbidden",
            CommerceError::Unauthenticated => "unauthenticated",
            CommerceError::Validation(_) => "validation",
            CommerceError::InvalidItem(_) => "invalid_item",
            CommerceError::Store(_) => "store",
        }
    }
}

impl From<CommerceError> for AppError {
    fn from(err: CommerceError) -> Self {
        match err {
            CommerceError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            CommerceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            CommerceError::Unauthenticated => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            CommerceError::Validation(msg) => AppError::InvalidInput(anyhow::anyhow!(msg)),
            CommerceError::InvalidItem(id) => AppError::BadRequest(anyhow::anyhow!(
                "Product with ID {} not found or deleted",
                id
            )),
            CommerceError::Store(e) => e,
        }
    }
}

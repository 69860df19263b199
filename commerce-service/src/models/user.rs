use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display data for an identity-provider user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

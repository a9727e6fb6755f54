//! The single admin-authorization gate. Every admin-only operation calls
//! this before its first mutating statement.

use thiserror::Error;

use crate::db::Store;
use crate::entities::accounts;
use crate::models::Role;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("Acting account not found")]
    NotFound,

    #[error("Admin role required")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),
}

/// Resolves the acting account and requires the admin role.
pub async fn require_admin(store: &Store, account_id: i32) -> Result<accounts::Model, AuthzError> {
    let account = store
        .get_account(account_id)
        .await
        .map_err(|e| AuthzError::Database(e.to_string()))?
        .ok_or(AuthzError::NotFound)?;

    if Role::parse(&account.role) != Role::Admin {
        return Err(AuthzError::Unauthorized);
    }

    Ok(account)
}

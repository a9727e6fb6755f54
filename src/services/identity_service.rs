//! Domain service for authentication and account management.
//!
//! Handles login, password and username changes, settings, and
//! admin-initiated account provisioning and resets.

use thiserror::Error;

use crate::entities::security_events;
use crate::models::{AccountProfile, AccountSettings, CreatedAccount, NewAccount};
use crate::services::authz::AuthzError;

/// Errors specific to identity operations.
///
/// `InvalidCredentials` deliberately covers both "no such account" and
/// "wrong password" so callers cannot enumerate accounts.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account temporarily locked until {until}")]
    AccountLocked { until: String },

    #[error("Not found")]
    NotFound,

    #[error("Password does not meet requirements")]
    WeakPassword(Vec<String>),

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Username has already been changed once")]
    UsernameAlreadyChanged,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for IdentityError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for IdentityError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AuthzError> for IdentityError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound => Self::NotFound,
            AuthzError::Unauthorized => Self::Unauthorized,
            AuthzError::Database(msg) => Self::Database(msg),
        }
    }
}

/// Caller-supplied request metadata, recorded with audit events.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Collapses to a single audit-friendly string, `None` when empty.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        match (self.ip.as_deref(), self.user_agent.as_deref()) {
            (Some(ip), Some(ua)) => Some(format!("{ip} ({ua})")),
            (Some(ip), None) => Some(ip.to_string()),
            (None, Some(ua)) => Some(ua.to_string()),
            (None, None) => None,
        }
    }
}

/// Domain service trait for identity operations.
#[async_trait::async_trait]
pub trait IdentityService: Send + Sync {
    /// Verifies credentials by username or email and returns the public
    /// profile merged with the linked member's contact fields.
    ///
    /// # Errors
    ///
    /// [`IdentityError::InvalidCredentials`] on unknown identifier or wrong
    /// password; [`IdentityError::AccountLocked`] while a lockout is active
    /// (without consuming another failed attempt).
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AccountProfile, IdentityError>;

    /// Changes a password. The current-password check is skipped only while
    /// the account's first-login flag is set; success clears that flag and
    /// the system-generated-password marker.
    async fn change_password(
        &self,
        account_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;

    /// One-time username change, enforced by a persisted flag.
    async fn change_username(
        &self,
        account_id: i32,
        new_username: &str,
    ) -> Result<AccountProfile, IdentityError>;

    /// Merges a sparse settings patch; unspecified keys are preserved.
    /// Returns the merged settings.
    async fn update_settings(
        &self,
        account_id: i32,
        patch: AccountSettings,
    ) -> Result<AccountSettings, IdentityError>;

    /// Admin-initiated reset. Generates a password when none is supplied,
    /// forces the first-login flag, and returns the plaintext temporary
    /// password exactly once.
    async fn admin_reset_password(
        &self,
        admin_id: i32,
        target_id: i32,
        new_password: Option<&str>,
    ) -> Result<String, IdentityError>;

    /// Creates an account. A system-generated password is used when the
    /// caller supplies none and is surfaced once via the result.
    async fn create_account(
        &self,
        data: NewAccount,
        created_by_admin_id: Option<i32>,
    ) -> Result<CreatedAccount, IdentityError>;

    /// Auto-provisions an account for an existing member: deterministic
    /// username from the member's full name, generated password, account
    /// wired to the member.
    async fn create_account_from_member(
        &self,
        member_id: i32,
    ) -> Result<CreatedAccount, IdentityError>;

    /// Admin-gated read of the audit trail, newest first.
    async fn security_log(
        &self,
        admin_id: i32,
        target_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<security_events::Model>, IdentityError>;
}

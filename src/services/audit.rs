//! Append-only audit trail of authentication-relevant actions.
//!
//! Every write here is best-effort: a failing audit insert is logged and
//! swallowed, and must never fail or roll back the operation that
//! triggered it.

use tracing::warn;

use crate::db::{NewSecurityEvent, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    LoginSuccess,
    LoginFailure,
    AccountLocked,
    PasswordChange,
    PasswordReset,
    UsernameChange,
    AccountCreated,
    CascadeDelete,
    UnauthorizedAccess,
}

impl SecurityEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::AccountLocked => "account_locked",
            Self::PasswordChange => "password_change",
            Self::PasswordReset => "password_reset",
            Self::UsernameChange => "username_change",
            Self::AccountCreated => "account_created",
            Self::CascadeDelete => "cascade_delete",
            Self::UnauthorizedAccess => "unauthorized_access",
        }
    }
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone)]
pub struct AccessAudit {
    store: Store,
}

impl AccessAudit {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Appends one audit record. Infallible by contract: errors are
    /// reported through `tracing` and suppressed.
    pub async fn record(
        &self,
        kind: SecurityEventKind,
        account_id: Option<i32>,
        success: bool,
        client_info: Option<String>,
        detail: Option<String>,
    ) {
        let event = NewSecurityEvent {
            account_id,
            event_type: kind.as_str().to_string(),
            success,
            client_info,
            detail,
        };

        if let Err(e) = self.store.append_security_event(event).await {
            warn!("Failed to append {kind} security event: {e}");
        }
    }
}

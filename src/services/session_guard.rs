//! Failed-attempt counting and time-boxed account lockout.
//!
//! Per-account state machine: Unlocked → (N consecutive failures) →
//! Locked(until) → (time elapses) → Unlocked. Expiry is lazy; no
//! background job clears stale lockouts.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::LockoutConfig;
use crate::db::{FailureOutcome, Store};
use crate::entities::accounts;
use crate::services::audit::{AccessAudit, SecurityEventKind};

#[derive(Clone)]
pub struct SecuritySessionGuard {
    store: Store,
    audit: AccessAudit,
    policy: LockoutConfig,
}

impl SecuritySessionGuard {
    #[must_use]
    pub const fn new(store: Store, audit: AccessAudit, policy: LockoutConfig) -> Self {
        Self {
            store,
            audit,
            policy,
        }
    }

    /// Returns the unlock instant while the account is locked. A lockout
    /// timestamp in the past is equivalent to unlocked.
    #[must_use]
    pub fn lockout_remaining(account: &accounts::Model) -> Option<DateTime<Utc>> {
        let until = account.locked_until.as_deref()?;
        let until = DateTime::parse_from_rfc3339(until).ok()?.with_timezone(&Utc);

        (until > Utc::now()).then_some(until)
    }

    /// Records one failed attempt inside a store transaction and logs the
    /// failure. The attempt that trips the threshold also logs an
    /// `account_locked` event.
    pub async fn record_failure(
        &self,
        account: &accounts::Model,
        client_info: Option<String>,
    ) -> Result<FailureOutcome> {
        let outcome = self
            .store
            .record_failed_attempt(
                account.id,
                self.policy.max_attempts,
                self.policy.lockout_minutes,
            )
            .await?;

        self.audit
            .record(
                SecurityEventKind::LoginFailure,
                Some(account.id),
                false,
                client_info.clone(),
                Some(format!(
                    "Invalid password ({} consecutive failures)",
                    outcome.failed_attempts
                )),
            )
            .await;

        if outcome.just_locked {
            self.audit
                .record(
                    SecurityEventKind::AccountLocked,
                    Some(account.id),
                    false,
                    client_info,
                    outcome
                        .locked_until
                        .as_ref()
                        .map(|until| format!("Account locked until {until}")),
                )
                .await;
        }

        Ok(outcome)
    }

    /// Resets the failure counter, clears any lockout, stamps the last
    /// login, and logs the success.
    pub async fn record_success(
        &self,
        account: &accounts::Model,
        client_info: Option<String>,
    ) -> Result<()> {
        self.store.record_successful_login(account.id).await?;

        self.audit
            .record(
                SecurityEventKind::LoginSuccess,
                Some(account.id),
                true,
                client_info,
                None,
            )
            .await;

        Ok(())
    }
}

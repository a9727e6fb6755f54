use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::entities::{accounts, prelude::*};

/// Row-level input for account creation. Hashing happens in the credential
/// vault before this ever reaches the repository.
#[derive(Debug, Clone)]
pub struct CreateAccountRow {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub salt: String,
    pub role: String,
    pub first_login: bool,
    pub password_generated: bool,
    pub member_id: Option<i32>,
    pub settings_json: String,
}

/// Result of recording one failed login attempt.
#[derive(Debug, Clone)]
pub struct FailureOutcome {
    pub failed_attempts: i32,
    pub locked_until: Option<String>,
    /// True only on the attempt that tripped the lockout.
    pub just_locked: bool,
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<accounts::Model>> {
        Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by id")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<accounts::Model>> {
        Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")
    }

    /// Looks up an account by username or email.
    pub async fn get_by_identifier(&self, identifier: &str) -> Result<Option<accounts::Model>> {
        Accounts::find()
            .filter(
                Condition::any()
                    .add(accounts::Column::Username.eq(identifier))
                    .add(accounts::Column::Email.eq(identifier)),
            )
            .one(&self.conn)
            .await
            .context("Failed to query account by identifier")
    }

    pub async fn list_all(&self) -> Result<Vec<accounts::Model>> {
        Accounts::find()
            .all(&self.conn)
            .await
            .context("Failed to list accounts")
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .count(&self.conn)
            .await
            .context("Failed to count accounts by username")?;

        Ok(count > 0)
    }

    pub async fn create(&self, row: CreateAccountRow) -> Result<accounts::Model> {
        let now = Utc::now().to_rfc3339();

        let active = accounts::ActiveModel {
            username: Set(row.username),
            email: Set(row.email),
            password_hash: Set(row.password_hash),
            salt: Set(row.salt),
            role: Set(row.role),
            first_login: Set(row.first_login),
            username_changed: Set(false),
            password_generated: Set(row.password_generated),
            failed_attempts: Set(0),
            locked_until: Set(None),
            last_login: Set(None),
            member_id: Set(row.member_id),
            settings_json: Set(row.settings_json),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert account")
    }

    /// Stores a new password hash. Clears the forced-change and
    /// generated-password markers when the owner set the password themselves.
    pub async fn update_password(
        &self,
        id: i32,
        password_hash: String,
        salt: String,
        first_login: bool,
        password_generated: bool,
    ) -> Result<()> {
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for password update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(password_hash);
        active.salt = Set(salt);
        active.first_login = Set(first_login);
        active.password_generated = Set(password_generated);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Renames the account and irreversibly consumes the one-time change.
    /// The flag re-check runs inside the same transaction as the write.
    pub async fn update_username(&self, id: i32, new_username: &str) -> Result<accounts::Model> {
        let txn = self.conn.begin().await?;

        let account = Accounts::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to query account for username change")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        if account.username_changed {
            anyhow::bail!("Username already changed for account {id}");
        }

        let mut active: accounts::ActiveModel = account.into();
        active.username = Set(new_username.to_string());
        active.username_changed = Set(true);
        active.updated_at = Set(Utc::now().to_rfc3339());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn update_settings_json(&self, id: i32, settings_json: String) -> Result<()> {
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for settings update")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.settings_json = Set(settings_json);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Increments the failed-attempt counter and trips the lockout at the
    /// threshold. Read and increment share one transaction so concurrent
    /// failures against the same account cannot lose updates.
    ///
    /// A failure against an account whose lockout has already expired starts
    /// a fresh consecutive-failure window.
    pub async fn record_failed_attempt(
        &self,
        id: i32,
        max_attempts: u32,
        lockout_minutes: i64,
    ) -> Result<FailureOutcome> {
        let txn = self.conn.begin().await?;

        let account = Accounts::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to query account for failure recording")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let lock_expired = account
            .locked_until
            .as_deref()
            .is_some_and(rfc3339_in_past);

        let attempts = if lock_expired {
            1
        } else {
            account.failed_attempts + 1
        };
        let already_locked = account.locked_until.is_some() && !lock_expired;

        let locked_until = if attempts >= max_attempts as i32 {
            Some((Utc::now() + Duration::minutes(lockout_minutes)).to_rfc3339())
        } else if lock_expired {
            None
        } else {
            account.locked_until.clone()
        };

        let mut active: accounts::ActiveModel = account.into();
        active.failed_attempts = Set(attempts);
        active.locked_until = Set(locked_until.clone());
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&txn).await?;

        txn.commit().await?;

        Ok(FailureOutcome {
            failed_attempts: attempts,
            locked_until: locked_until.clone(),
            just_locked: locked_until.is_some() && !already_locked,
        })
    }

    /// Clears the failure counter and lockout, stamps the last login.
    pub async fn record_successful_login(&self, id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;

        let account = Accounts::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to query account for success recording")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let now = Utc::now().to_rfc3339();

        let mut active: accounts::ActiveModel = account.into();
        active.failed_attempts = Set(0);
        active.locked_until = Set(None);
        active.last_login = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}

/// True when the RFC 3339 instant lies in the past. Unparseable values are
/// treated as expired rather than locking the account forever.
pub(crate) fn rfc3339_in_past(ts: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|t| t.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true)
}

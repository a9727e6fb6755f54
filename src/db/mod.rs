use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{CreateAccountRow, FailureOutcome};
pub use repositories::consistency::{CascadeRemoval, GraphSnapshot, MemberRemoval};
pub use repositories::lookup::OrphanSweep;
pub use repositories::security_event::NewSecurityEvent;

use crate::entities::{accounts, members, security_events};
use crate::models::MemberInput;

/// Shared store handle. Injected into every component constructor so the
/// whole core can run against an in-memory database under test.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn member_repo(&self) -> repositories::member::MemberRepository {
        repositories::member::MemberRepository::new(self.conn.clone())
    }

    fn lookup_repo(&self) -> repositories::lookup::LookupRepository {
        repositories::lookup::LookupRepository::new(self.conn.clone())
    }

    fn consistency_repo(&self) -> repositories::consistency::ConsistencyRepository {
        repositories::consistency::ConsistencyRepository::new(self.conn.clone())
    }

    fn security_event_repo(&self) -> repositories::security_event::SecurityEventRepository {
        repositories::security_event::SecurityEventRepository::new(self.conn.clone())
    }

    // ========== Accounts ==========

    pub async fn get_account(&self, id: i32) -> Result<Option<accounts::Model>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<accounts::Model>> {
        self.account_repo().get_by_username(username).await
    }

    pub async fn get_account_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<accounts::Model>> {
        self.account_repo().get_by_identifier(identifier).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<accounts::Model>> {
        self.account_repo().list_all().await
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        self.account_repo().username_exists(username).await
    }

    pub async fn create_account(&self, row: CreateAccountRow) -> Result<accounts::Model> {
        self.account_repo().create(row).await
    }

    pub async fn update_account_password(
        &self,
        id: i32,
        password_hash: String,
        salt: String,
        first_login: bool,
        password_generated: bool,
    ) -> Result<()> {
        self.account_repo()
            .update_password(id, password_hash, salt, first_login, password_generated)
            .await
    }

    pub async fn update_account_username(
        &self,
        id: i32,
        new_username: &str,
    ) -> Result<accounts::Model> {
        self.account_repo().update_username(id, new_username).await
    }

    pub async fn update_account_settings(&self, id: i32, settings_json: String) -> Result<()> {
        self.account_repo()
            .update_settings_json(id, settings_json)
            .await
    }

    pub async fn record_failed_attempt(
        &self,
        id: i32,
        max_attempts: u32,
        lockout_minutes: i64,
    ) -> Result<FailureOutcome> {
        self.account_repo()
            .record_failed_attempt(id, max_attempts, lockout_minutes)
            .await
    }

    pub async fn record_successful_login(&self, id: i32) -> Result<()> {
        self.account_repo().record_successful_login(id).await
    }

    // ========== Members & lookups ==========

    pub async fn get_member(&self, id: i32) -> Result<Option<members::Model>> {
        self.member_repo().get_by_id(id).await
    }

    pub async fn create_member(&self, input: &MemberInput) -> Result<members::Model> {
        self.member_repo().create(input).await
    }

    pub async fn list_members(&self) -> Result<Vec<members::Model>> {
        self.member_repo().list_all().await
    }

    pub async fn accounts_for_member(&self, member_id: i32) -> Result<Vec<accounts::Model>> {
        self.member_repo().accounts_for_member(member_id).await
    }

    pub async fn member_skill_names(&self, member_id: i32) -> Result<Vec<String>> {
        self.member_repo().skill_names(member_id).await
    }

    pub async fn get_branch_by_name(
        &self,
        name: &str,
    ) -> Result<Option<crate::entities::branches::Model>> {
        self.lookup_repo().get_branch_by_name(name).await
    }

    pub async fn get_skill_by_name(
        &self,
        name: &str,
    ) -> Result<Option<crate::entities::skills::Model>> {
        self.lookup_repo().get_skill_by_name(name).await
    }

    pub async fn cleanup_orphaned_lookups(&self) -> Result<OrphanSweep> {
        self.lookup_repo().cleanup_orphaned().await
    }

    // ========== Consistency ==========

    pub async fn graph_snapshot(&self) -> Result<GraphSnapshot> {
        self.consistency_repo().snapshot().await
    }

    pub async fn cascade_delete_account_rows(
        &self,
        account_id: i32,
    ) -> Result<Option<CascadeRemoval>> {
        self.consistency_repo()
            .cascade_delete_account(account_id)
            .await
    }

    pub async fn remove_unlinked_member(&self, member_id: i32) -> Result<Option<MemberRemoval>> {
        self.consistency_repo().remove_unlinked_member(member_id).await
    }

    // ========== Security events ==========

    pub async fn append_security_event(&self, event: NewSecurityEvent) -> Result<()> {
        self.security_event_repo().append(event).await
    }

    pub async fn recent_security_events(
        &self,
        account_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<security_events::Model>> {
        self.security_event_repo().recent(account_id, limit).await
    }
}

/// True when the error chain bottoms out in a unique-constraint violation.
/// Inspected by variant, never by message text.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>()
        .and_then(DbErr::sql_err)
        .is_some_and(|sql_err| matches!(sql_err, SqlErr::UniqueConstraintViolation(_)))
}

//! Domain service for relational-invariant checking and repair.
//!
//! Owns the cascading account deletion, the read-only consistency scan,
//! and orphaned-lookup reclamation.

use serde::Serialize;
use thiserror::Error;

use crate::db::OrphanSweep;
use crate::services::authz::AuthzError;

#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ConsistencyError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ConsistencyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AuthzError> for ConsistencyError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound => Self::NotFound,
            AuthzError::Unauthorized => Self::Unauthorized,
            AuthzError::Database(msg) => Self::Database(msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsistencyStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// An account references a member row that does not exist.
    MissingMember,
    /// A member has no owning account.
    UnlinkedMember,
    /// A member is referenced by more than one account.
    DuplicateLink,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyIssue {
    pub kind: IssueKind,
    pub description: String,
    pub account_id: Option<i32>,
    pub member_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConsistencyStatistics {
    pub total_accounts: usize,
    pub total_members: usize,
    pub linked_accounts: usize,
    pub unlinked_accounts: usize,
}

/// Output of one full invariant scan.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub status: ConsistencyStatus,
    pub issues: Vec<ConsistencyIssue>,
    pub statistics: ConsistencyStatistics,
}

impl ConsistencyReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ConsistencyStatus::Passed
    }
}

/// Point check of one specific account ↔ member pairing.
#[derive(Debug, Clone, Serialize)]
pub struct LinkageCheck {
    pub valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedMember {
    pub id: i32,
    pub full_name: String,
}

/// Result of a committed cascade, including the post-commit re-check so
/// callers can detect regressions immediately.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeOutcome {
    pub deleted_account_id: i32,
    pub deleted_username: String,
    pub deleted_member: Option<DeletedMember>,
    pub removed_branch: Option<String>,
    pub removed_industry: Option<String>,
    pub removed_company: Option<String>,
    pub removed_skills: Vec<String>,
    pub consistency: ConsistencyReport,
}

/// Domain service trait for the consistency engine.
#[async_trait::async_trait]
pub trait ConsistencyEngine: Send + Sync {
    /// Read-only scan of the account/member graph. Idempotent and safe to
    /// call at any time; never mutates data.
    async fn check_consistency(&self) -> Result<ConsistencyReport, ConsistencyError>;

    /// Deletes an account, its linked member, the member's skill junction
    /// rows, and any lookup rows the removal orphans — atomically. Requires
    /// the acting account to hold the admin role, checked before any
    /// mutating step.
    async fn cascade_delete_account(
        &self,
        account_id: i32,
        acting_admin_id: i32,
    ) -> Result<CascadeOutcome, ConsistencyError>;

    /// Standalone orphan sweep for periodic maintenance. Re-entrant.
    async fn cleanup_orphaned_lookups(&self) -> Result<OrphanSweep, ConsistencyError>;

    /// Point check used before operations that assume a specific
    /// account ↔ member pairing.
    async fn validate_linkage(
        &self,
        member_id: i32,
        account_id: i32,
    ) -> Result<LinkageCheck, ConsistencyError>;
}

//! `SeaORM` implementation of the `ConsistencyEngine` trait.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::db::{OrphanSweep, Store};
use crate::services::audit::{AccessAudit, SecurityEventKind};
use crate::services::authz::require_admin;
use crate::services::consistency_service::{
    CascadeOutcome, ConsistencyEngine, ConsistencyError, ConsistencyIssue, ConsistencyReport,
    ConsistencyStatistics, ConsistencyStatus, DeletedMember, IssueKind, LinkageCheck,
};

pub struct SeaOrmConsistencyEngine {
    store: Store,
    audit: AccessAudit,
}

impl SeaOrmConsistencyEngine {
    #[must_use]
    pub fn new(store: Store) -> Self {
        let audit = AccessAudit::new(store.clone());
        Self { store, audit }
    }
}

#[async_trait]
impl ConsistencyEngine for SeaOrmConsistencyEngine {
    async fn check_consistency(&self) -> Result<ConsistencyReport, ConsistencyError> {
        let snapshot = self.store.graph_snapshot().await?;

        let member_ids: HashSet<i32> = snapshot.members.iter().map(|m| m.id).collect();
        let member_names: HashMap<i32, &str> = snapshot
            .members
            .iter()
            .map(|m| (m.id, m.full_name.as_str()))
            .collect();

        let mut issues = Vec::new();
        let mut linked_accounts = 0usize;
        let mut owners_per_member: HashMap<i32, Vec<&str>> = HashMap::new();

        for account in &snapshot.accounts {
            let Some(member_id) = account.member_id else {
                continue;
            };
            linked_accounts += 1;

            if member_ids.contains(&member_id) {
                owners_per_member
                    .entry(member_id)
                    .or_default()
                    .push(account.username.as_str());
            } else {
                issues.push(ConsistencyIssue {
                    kind: IssueKind::MissingMember,
                    description: format!(
                        "Account '{}' (id {}) references missing member {member_id}",
                        account.username, account.id
                    ),
                    account_id: Some(account.id),
                    member_id: Some(member_id),
                });
            }
        }

        for (member_id, owners) in &owners_per_member {
            if owners.len() > 1 {
                issues.push(ConsistencyIssue {
                    kind: IssueKind::DuplicateLink,
                    description: format!(
                        "Member {member_id} is referenced by {} accounts: {}",
                        owners.len(),
                        owners.join(", ")
                    ),
                    account_id: None,
                    member_id: Some(*member_id),
                });
            }
        }

        for member in &snapshot.members {
            if !owners_per_member.contains_key(&member.id) {
                issues.push(ConsistencyIssue {
                    kind: IssueKind::UnlinkedMember,
                    description: format!(
                        "Member '{}' (id {}) has no owning account",
                        member_names.get(&member.id).unwrap_or(&"?"),
                        member.id
                    ),
                    account_id: None,
                    member_id: Some(member.id),
                });
            }
        }

        let statistics = ConsistencyStatistics {
            total_accounts: snapshot.accounts.len(),
            total_members: snapshot.members.len(),
            linked_accounts,
            unlinked_accounts: snapshot.accounts.len() - linked_accounts,
        };

        let status = if issues.is_empty() {
            ConsistencyStatus::Passed
        } else {
            ConsistencyStatus::Failed
        };

        Ok(ConsistencyReport {
            status,
            issues,
            statistics,
        })
    }

    async fn cascade_delete_account(
        &self,
        account_id: i32,
        acting_admin_id: i32,
    ) -> Result<CascadeOutcome, ConsistencyError> {
        // Authorization gate runs before the first mutating statement.
        let admin = match require_admin(&self.store, acting_admin_id).await {
            Ok(admin) => admin,
            Err(e) => {
                self.audit
                    .record(
                        SecurityEventKind::UnauthorizedAccess,
                        Some(acting_admin_id),
                        false,
                        None,
                        Some(format!(
                            "Cascade delete of account {account_id} rejected: {e}"
                        )),
                    )
                    .await;
                return Err(e.into());
            }
        };

        let removal = self
            .store
            .cascade_delete_account_rows(account_id)
            .await?
            .ok_or(ConsistencyError::NotFound)?;

        // Post-commit: the audit append is best-effort and the re-check
        // reports on the now-committed state.
        let member_detail = removal
            .member
            .as_ref()
            .map(|m| format!(" and member '{}' ({})", m.full_name, m.id))
            .unwrap_or_default();

        self.audit
            .record(
                SecurityEventKind::CascadeDelete,
                Some(admin.id),
                true,
                None,
                Some(format!(
                    "Admin '{}' cascade-deleted account '{}' ({}){member_detail}",
                    admin.username, removal.account.username, removal.account.id
                )),
            )
            .await;

        let consistency = self.check_consistency().await?;

        Ok(CascadeOutcome {
            deleted_account_id: removal.account.id,
            deleted_username: removal.account.username,
            deleted_member: removal.member.map(|m| DeletedMember {
                id: m.id,
                full_name: m.full_name,
            }),
            removed_branch: removal.removed_branch,
            removed_industry: removal.removed_industry,
            removed_company: removal.removed_company,
            removed_skills: removal.removed_skills,
            consistency,
        })
    }

    async fn cleanup_orphaned_lookups(&self) -> Result<OrphanSweep, ConsistencyError> {
        Ok(self.store.cleanup_orphaned_lookups().await?)
    }

    async fn validate_linkage(
        &self,
        member_id: i32,
        account_id: i32,
    ) -> Result<LinkageCheck, ConsistencyError> {
        let mut issues = Vec::new();

        let member = self.store.get_member(member_id).await?;
        if member.is_none() {
            issues.push(format!("Member {member_id} does not exist"));
        }

        match self.store.get_account(account_id).await? {
            None => issues.push(format!("Account {account_id} does not exist")),
            Some(account) => {
                if account.member_id != Some(member_id) {
                    issues.push(format!(
                        "Account '{}' ({account_id}) is not linked to member {member_id}",
                        account.username
                    ));
                }
            }
        }

        if member.is_some() {
            let owners = self.store.accounts_for_member(member_id).await?;
            if owners.len() > 1 {
                issues.push(format!(
                    "Member {member_id} is referenced by {} accounts",
                    owners.len()
                ));
            }
        }

        Ok(LinkageCheck {
            valid: issues.is_empty(),
            issues,
        })
    }
}

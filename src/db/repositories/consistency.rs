use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, TransactionTrait,
};

use crate::entities::{accounts, member_skills, members, prelude::*};

/// Everything removed by one cascade. Lookup names are reported so callers
/// and the audit trail can name what was reclaimed.
#[derive(Debug, Clone)]
pub struct CascadeRemoval {
    pub account: accounts::Model,
    pub member: Option<members::Model>,
    pub removed_branch: Option<String>,
    pub removed_industry: Option<String>,
    pub removed_company: Option<String>,
    pub removed_skills: Vec<String>,
}

/// Removal of a member that never had an owning account.
#[derive(Debug, Clone)]
pub struct MemberRemoval {
    pub member: members::Model,
    pub removed_branch: Option<String>,
    pub removed_industry: Option<String>,
    pub removed_company: Option<String>,
    pub removed_skills: Vec<String>,
}

/// Point-in-time view of the account/member graph, read in a single
/// transaction so a cascade mid-flight is never half-observed.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub accounts: Vec<accounts::Model>,
    pub members: Vec<members::Model>,
}

pub struct ConsistencyRepository {
    conn: DatabaseConnection,
}

impl ConsistencyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        let txn = self.conn.begin().await?;

        let accounts = Accounts::find()
            .all(&txn)
            .await
            .context("Failed to snapshot accounts")?;
        let members = Members::find()
            .all(&txn)
            .await
            .context("Failed to snapshot members")?;

        txn.commit().await?;

        Ok(GraphSnapshot { accounts, members })
    }

    /// Deletes an account together with its linked member, the member's
    /// skill junction rows, and any lookup rows left unreferenced. One
    /// transaction: either the whole cascade commits or none of it does.
    ///
    /// Returns `None` when the account does not exist.
    pub async fn cascade_delete_account(&self, account_id: i32) -> Result<Option<CascadeRemoval>> {
        let txn = self.conn.begin().await?;

        let Some(account) = Accounts::find_by_id(account_id)
            .one(&txn)
            .await
            .context("Failed to load account for cascade")?
        else {
            return Ok(None);
        };

        let member = match account.member_id {
            Some(member_id) => Members::find_by_id(member_id)
                .one(&txn)
                .await
                .context("Failed to load member for cascade")?,
            None => None,
        };

        // The account row goes first: accounts.member_id references members.
        Accounts::delete_by_id(account.id)
            .exec(&txn)
            .await
            .context("Failed to delete account row")?;

        let mut removal = CascadeRemoval {
            account: account.clone(),
            member: member.clone(),
            removed_branch: None,
            removed_industry: None,
            removed_company: None,
            removed_skills: Vec::new(),
        };

        if let Some(member) = member {
            let reclaimed = delete_member_in_txn(&txn, &member).await?;
            removal.removed_branch = reclaimed.removed_branch;
            removal.removed_industry = reclaimed.removed_industry;
            removal.removed_company = reclaimed.removed_company;
            removal.removed_skills = reclaimed.removed_skills;
        }

        txn.commit().await?;
        Ok(Some(removal))
    }

    /// Direct removal of a member with no owning account. Refuses when any
    /// account still links the member; that path must go through the cascade.
    pub async fn remove_unlinked_member(&self, member_id: i32) -> Result<Option<MemberRemoval>> {
        let txn = self.conn.begin().await?;

        let Some(member) = Members::find_by_id(member_id)
            .one(&txn)
            .await
            .context("Failed to load member for removal")?
        else {
            return Ok(None);
        };

        let owners = Accounts::find()
            .filter(accounts::Column::MemberId.eq(member_id))
            .count(&txn)
            .await?;
        if owners > 0 {
            anyhow::bail!("Member {member_id} is linked to an account; cascade-delete the account instead");
        }

        let reclaimed = delete_member_in_txn(&txn, &member).await?;

        txn.commit().await?;

        Ok(Some(MemberRemoval {
            member,
            removed_branch: reclaimed.removed_branch,
            removed_industry: reclaimed.removed_industry,
            removed_company: reclaimed.removed_company,
            removed_skills: reclaimed.removed_skills,
        }))
    }
}

struct ReclaimedLookups {
    removed_branch: Option<String>,
    removed_industry: Option<String>,
    removed_company: Option<String>,
    removed_skills: Vec<String>,
}

/// Removes the member row, its skill junction rows, and every lookup row
/// the removal orphans. Must run inside the caller's transaction.
async fn delete_member_in_txn(
    txn: &DatabaseTransaction,
    member: &members::Model,
) -> Result<ReclaimedLookups> {
    let skill_ids: Vec<i32> = MemberSkills::find()
        .filter(member_skills::Column::MemberId.eq(member.id))
        .all(txn)
        .await
        .context("Failed to load member skill links")?
        .into_iter()
        .map(|row| row.skill_id)
        .collect();

    MemberSkills::delete_many()
        .filter(member_skills::Column::MemberId.eq(member.id))
        .exec(txn)
        .await
        .context("Failed to delete member skill links")?;

    Members::delete_by_id(member.id)
        .exec(txn)
        .await
        .context("Failed to delete member row")?;

    let mut reclaimed = ReclaimedLookups {
        removed_branch: None,
        removed_industry: None,
        removed_company: None,
        removed_skills: Vec::new(),
    };

    // Lazy orphan collection: each former reference is checked against the
    // remaining members and dropped only when nothing references it anymore.
    if let Some(branch_id) = member.branch_id {
        let refs = Members::find()
            .filter(members::Column::BranchId.eq(branch_id))
            .count(txn)
            .await?;
        if refs == 0
            && let Some(branch) = Branches::find_by_id(branch_id).one(txn).await?
        {
            Branches::delete_by_id(branch_id).exec(txn).await?;
            reclaimed.removed_branch = Some(branch.name);
        }
    }

    if let Some(industry_id) = member.industry_id {
        let refs = Members::find()
            .filter(members::Column::IndustryId.eq(industry_id))
            .count(txn)
            .await?;
        if refs == 0
            && let Some(industry) = Industries::find_by_id(industry_id).one(txn).await?
        {
            Industries::delete_by_id(industry_id).exec(txn).await?;
            reclaimed.removed_industry = Some(industry.name);
        }
    }

    if let Some(company_id) = member.company_id {
        let refs = Members::find()
            .filter(members::Column::CompanyId.eq(company_id))
            .count(txn)
            .await?;
        if refs == 0
            && let Some(company) = Companies::find_by_id(company_id).one(txn).await?
        {
            Companies::delete_by_id(company_id).exec(txn).await?;
            reclaimed.removed_company = Some(company.name);
        }
    }

    for skill_id in skill_ids {
        let refs = MemberSkills::find()
            .filter(member_skills::Column::SkillId.eq(skill_id))
            .count(txn)
            .await?;
        if refs == 0
            && let Some(skill) = Skills::find_by_id(skill_id).one(txn).await?
        {
            Skills::delete_by_id(skill_id).exec(txn).await?;
            reclaimed.removed_skills.push(skill.name);
        }
    }

    Ok(reclaimed)
}

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};

use crate::entities::{branches, companies, industries, member_skills, members, prelude::*, skills};

/// Counts removed by one orphan sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct OrphanSweep {
    pub branches_removed: u64,
    pub industries_removed: u64,
    pub companies_removed: u64,
    pub skills_removed: u64,
}

impl OrphanSweep {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.branches_removed + self.industries_removed + self.companies_removed
            + self.skills_removed
    }
}

/// Lookup rows are deduplicated reference values: resolving a name either
/// finds the existing row or inserts one. The helpers are generic over the
/// connection so the cascade can call them mid-transaction.
pub async fn get_or_create_branch<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32> {
    if let Some(row) = Branches::find()
        .filter(branches::Column::Name.eq(name))
        .one(conn)
        .await
        .context("Failed to query branch by name")?
    {
        return Ok(row.id);
    }

    let row = branches::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to insert branch")?;

    Ok(row.id)
}

pub async fn get_or_create_industry<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32> {
    if let Some(row) = Industries::find()
        .filter(industries::Column::Name.eq(name))
        .one(conn)
        .await
        .context("Failed to query industry by name")?
    {
        return Ok(row.id);
    }

    let row = industries::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to insert industry")?;

    Ok(row.id)
}

pub async fn get_or_create_company<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32> {
    if let Some(row) = Companies::find()
        .filter(companies::Column::Name.eq(name))
        .one(conn)
        .await
        .context("Failed to query company by name")?
    {
        return Ok(row.id);
    }

    let row = companies::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to insert company")?;

    Ok(row.id)
}

pub async fn get_or_create_skill<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32> {
    if let Some(row) = Skills::find()
        .filter(skills::Column::Name.eq(name))
        .one(conn)
        .await
        .context("Failed to query skill by name")?
    {
        return Ok(row.id);
    }

    let row = skills::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to insert skill")?;

    Ok(row.id)
}

pub struct LookupRepository {
    conn: DatabaseConnection,
}

impl LookupRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_branch_by_name(&self, name: &str) -> Result<Option<branches::Model>> {
        Branches::find()
            .filter(branches::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query branch by name")
    }

    pub async fn get_skill_by_name(&self, name: &str) -> Result<Option<skills::Model>> {
        Skills::find()
            .filter(skills::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query skill by name")
    }

    /// Removes every lookup row with zero referencing rows. Re-entrant: a
    /// second run with no intervening writes removes nothing.
    pub async fn cleanup_orphaned(&self) -> Result<OrphanSweep> {
        let txn = self.conn.begin().await?;

        let mut sweep = OrphanSweep::default();

        for branch in Branches::find().all(&txn).await? {
            let refs = Members::find()
                .filter(members::Column::BranchId.eq(branch.id))
                .count(&txn)
                .await?;
            if refs == 0 {
                Branches::delete_by_id(branch.id).exec(&txn).await?;
                sweep.branches_removed += 1;
            }
        }

        for industry in Industries::find().all(&txn).await? {
            let refs = Members::find()
                .filter(members::Column::IndustryId.eq(industry.id))
                .count(&txn)
                .await?;
            if refs == 0 {
                Industries::delete_by_id(industry.id).exec(&txn).await?;
                sweep.industries_removed += 1;
            }
        }

        for company in Companies::find().all(&txn).await? {
            let refs = Members::find()
                .filter(members::Column::CompanyId.eq(company.id))
                .count(&txn)
                .await?;
            if refs == 0 {
                Companies::delete_by_id(company.id).exec(&txn).await?;
                sweep.companies_removed += 1;
            }
        }

        for skill in Skills::find().all(&txn).await? {
            let refs = MemberSkills::find()
                .filter(member_skills::Column::SkillId.eq(skill.id))
                .count(&txn)
                .await?;
            if refs == 0 {
                Skills::delete_by_id(skill.id).exec(&txn).await?;
                sweep.skills_removed += 1;
            }
        }

        txn.commit().await?;
        Ok(sweep)
    }
}

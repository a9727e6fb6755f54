use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::db::repositories::lookup;
use crate::entities::{accounts, member_skills, members, prelude::*};
use crate::models::MemberInput;

pub struct MemberRepository {
    conn: DatabaseConnection,
}

impl MemberRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<members::Model>> {
        Members::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query member by id")
    }

    pub async fn list_all(&self) -> Result<Vec<members::Model>> {
        Members::find()
            .all(&self.conn)
            .await
            .context("Failed to list members")
    }

    /// All accounts claiming this member. More than one is a consistency
    /// violation the engine reports.
    pub async fn accounts_for_member(&self, member_id: i32) -> Result<Vec<accounts::Model>> {
        Accounts::find()
            .filter(accounts::Column::MemberId.eq(member_id))
            .all(&self.conn)
            .await
            .context("Failed to query accounts for member")
    }

    pub async fn skill_names(&self, member_id: i32) -> Result<Vec<String>> {
        let rows = MemberSkills::find()
            .filter(member_skills::Column::MemberId.eq(member_id))
            .find_also_related(Skills)
            .all(&self.conn)
            .await
            .context("Failed to query member skills")?;

        Ok(rows
            .into_iter()
            .filter_map(|(_, skill)| skill.map(|s| s.name))
            .collect())
    }

    /// Creates a member profile, resolving lookup names (branch, industry,
    /// company, skills) with get-or-create semantics inside one transaction.
    pub async fn create(&self, input: &MemberInput) -> Result<members::Model> {
        let txn = self.conn.begin().await?;

        let branch_id = match input.branch.as_deref() {
            Some(name) => Some(lookup::get_or_create_branch(&txn, name).await?),
            None => None,
        };
        let industry_id = match input.industry.as_deref() {
            Some(name) => Some(lookup::get_or_create_industry(&txn, name).await?),
            None => None,
        };
        let company_id = match input.company.as_deref() {
            Some(name) => Some(lookup::get_or_create_company(&txn, name).await?),
            None => None,
        };

        let now = Utc::now().to_rfc3339();

        let member = members::ActiveModel {
            full_name: Set(input.full_name.clone()),
            email: Set(input.email.clone()),
            phone: Set(input.phone.clone()),
            batch_year: Set(input.batch_year),
            membership_no: Set(input.membership_no.clone()),
            membership_type: Set(input.membership_type.clone()),
            branch_id: Set(branch_id),
            industry_id: Set(industry_id),
            company_id: Set(company_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert member")?;

        let mut seen = std::collections::HashSet::new();
        for skill_name in &input.skills {
            let skill_id = lookup::get_or_create_skill(&txn, skill_name).await?;
            if !seen.insert(skill_id) {
                continue;
            }

            member_skills::ActiveModel {
                member_id: Set(member.id),
                skill_id: Set(skill_id),
            }
            .insert(&txn)
            .await
            .context("Failed to link member skill")?;
        }

        txn.commit().await?;
        Ok(member)
    }

    pub async fn count(&self) -> Result<u64> {
        Members::find()
            .count(&self.conn)
            .await
            .context("Failed to count members")
    }
}

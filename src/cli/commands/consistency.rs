use crate::config::Config;
use crate::services::{ConsistencyEngine, ConsistencyStatus, SeaOrmConsistencyEngine};

use super::open_store;

pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let engine = SeaOrmConsistencyEngine::new(store);

    let report = engine
        .check_consistency()
        .await
        .map_err(|e| anyhow::anyhow!("Consistency check failed: {e}"))?;

    println!("Consistency Report");
    println!("{:-<70}", "");

    let status = match report.status {
        ConsistencyStatus::Passed => "PASSED",
        ConsistencyStatus::Failed => "FAILED",
    };
    println!("Status: {status}");
    println!(
        "Accounts: {} total ({} linked, {} unlinked) | Members: {}",
        report.statistics.total_accounts,
        report.statistics.linked_accounts,
        report.statistics.unlinked_accounts,
        report.statistics.total_members
    );

    if !report.issues.is_empty() {
        println!();
        println!("Issues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  • {}", issue.description);
        }
        println!();
        println!("Run 'rosterr cleanup' for orphaned lookups; linkage issues need operator action.");
    }

    Ok(())
}

pub async fn cmd_cleanup(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let engine = SeaOrmConsistencyEngine::new(store);

    let sweep = engine
        .cleanup_orphaned_lookups()
        .await
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    println!("Orphan sweep complete ({} rows removed)", sweep.total());
    println!("  Branches:   {}", sweep.branches_removed);
    println!("  Industries: {}", sweep.industries_removed);
    println!("  Companies:  {}", sweep.companies_removed);
    println!("  Skills:     {}", sweep.skills_removed);

    Ok(())
}

pub async fn cmd_delete_account(
    config: &Config,
    username: &str,
    admin_username: &str,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let account = store
        .get_account_by_username(username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Account '{username}' not found"))?;
    let admin = store
        .get_account_by_username(admin_username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Admin account '{admin_username}' not found"))?;

    println!(
        "Cascade-delete account '{}' (id {})? This also removes its member profile.",
        account.username, account.id
    );
    println!("Enter 'y' to confirm, anything else to cancel:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if !input.trim().eq_ignore_ascii_case("y") {
        println!("Cancelled.");
        return Ok(());
    }

    let engine = SeaOrmConsistencyEngine::new(store);
    let outcome = engine
        .cascade_delete_account(account.id, admin.id)
        .await
        .map_err(|e| anyhow::anyhow!("Cascade delete failed: {e}"))?;

    println!("✓ Deleted account '{}'", outcome.deleted_username);
    if let Some(member) = &outcome.deleted_member {
        println!("  Member profile: '{}' (id {})", member.full_name, member.id);
    }
    if let Some(branch) = &outcome.removed_branch {
        println!("  Reclaimed branch: {branch}");
    }
    if let Some(industry) = &outcome.removed_industry {
        println!("  Reclaimed industry: {industry}");
    }
    if let Some(company) = &outcome.removed_company {
        println!("  Reclaimed company: {company}");
    }
    for skill in &outcome.removed_skills {
        println!("  Reclaimed skill: {skill}");
    }

    let status = if outcome.consistency.passed() {
        "PASSED"
    } else {
        "FAILED"
    };
    println!("  Post-delete consistency: {status}");

    Ok(())
}

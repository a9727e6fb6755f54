use crate::config::Config;
use crate::models::{NewAccount, Role};
use crate::services::{IdentityService, SeaOrmIdentityService};

use super::open_store;

pub async fn cmd_reset_password(
    config: &Config,
    username: &str,
    admin_username: &str,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let target = store
        .get_account_by_username(username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Account '{username}' not found"))?;
    let admin = store
        .get_account_by_username(admin_username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Admin account '{admin_username}' not found"))?;

    let identity = SeaOrmIdentityService::new(store, &config.security);

    let temporary = identity
        .admin_reset_password(admin.id, target.id, None)
        .await
        .map_err(|e| anyhow::anyhow!("Password reset failed: {e}"))?;

    println!("✓ Password reset for '{username}'");
    println!("  Temporary password: {temporary}");
    println!("  It must be changed on next login. This is the only time it is shown.");

    Ok(())
}

pub async fn cmd_create_admin(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let identity = SeaOrmIdentityService::new(store, &config.security);

    let created = identity
        .create_account(
            NewAccount {
                username: username.to_string(),
                role: Some(Role::Admin),
                ..Default::default()
            },
            None,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Account creation failed: {e}"))?;

    println!("✓ Created admin account '{}'", created.profile.username);
    if let Some(temporary) = created.temporary_password {
        println!("  Temporary password: {temporary}");
        println!("  It must be changed on next login. This is the only time it is shown.");
    }

    Ok(())
}

pub async fn cmd_security_log(
    config: &Config,
    limit: u64,
    target_username: Option<&str>,
    admin_username: &str,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let admin = store
        .get_account_by_username(admin_username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Admin account '{admin_username}' not found"))?;

    let target_id = match target_username {
        Some(name) => Some(
            store
                .get_account_by_username(name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Account '{name}' not found"))?
                .id,
        ),
        None => None,
    };

    let identity = SeaOrmIdentityService::new(store, &config.security);

    let events = identity
        .security_log(admin.id, target_id, limit)
        .await
        .map_err(|e| anyhow::anyhow!("Security log read failed: {e}"))?;

    if events.is_empty() {
        println!("No security events recorded.");
        return Ok(());
    }

    println!("Security Events (last {})", events.len());
    println!("{:-<70}", "");

    for event in events {
        let marker = if event.success { "✓" } else { "✗" };
        let account = event
            .account_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());

        println!(
            "{} [{}] {} | account: {}",
            marker, event.created_at, event.event_type, account
        );
        if let Some(detail) = &event.detail {
            println!("    {detail}");
        }
        if let Some(client) = &event.client_info {
            println!("    Client: {client}");
        }
    }

    Ok(())
}

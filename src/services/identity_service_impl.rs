//! `SeaORM` implementation of the `IdentityService` trait.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::config::SecurityConfig;
use crate::db::{CreateAccountRow, Store, is_unique_violation};
use crate::entities::{accounts, security_events};
use crate::models::{AccountProfile, AccountSettings, CreatedAccount, NewAccount, Role};
use crate::services::audit::{AccessAudit, SecurityEventKind};
use crate::services::authz::require_admin;
use crate::services::credential_vault::{CredentialVault, VaultError, derive_username};
use crate::services::identity_service::{ClientInfo, IdentityError, IdentityService};
use crate::services::session_guard::SecuritySessionGuard;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").expect("Invalid regex"))
}

pub struct SeaOrmIdentityService {
    store: Store,
    vault: CredentialVault,
    guard: SecuritySessionGuard,
    audit: AccessAudit,
}

impl SeaOrmIdentityService {
    #[must_use]
    pub fn new(store: Store, config: &SecurityConfig) -> Self {
        let audit = AccessAudit::new(store.clone());
        let vault = CredentialVault::new(config.clone());
        let guard =
            SecuritySessionGuard::new(store.clone(), audit.clone(), config.lockout.clone());

        Self {
            store,
            vault,
            guard,
            audit,
        }
    }

    async fn load_account(&self, id: i32) -> Result<accounts::Model, IdentityError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// Profile merged with the linked member's contact fields.
    async fn profile_for(&self, account: &accounts::Model) -> Result<AccountProfile, IdentityError> {
        let member = match account.member_id {
            Some(member_id) => self.store.get_member(member_id).await?,
            None => None,
        };

        Ok(AccountProfile::from_account(account, member.as_ref()))
    }

    fn check_strength(&self, password: &str) -> Result<(), IdentityError> {
        let strength = self.vault.validate_strength(password);
        if strength.valid {
            return Ok(());
        }

        Err(IdentityError::WeakPassword(
            strength
                .unmet
                .iter()
                .map(|r| r.description().to_string())
                .collect(),
        ))
    }

    /// A member may be wired to at most one account.
    async fn ensure_member_unlinked(&self, member_id: i32) -> Result<(), IdentityError> {
        if self.store.get_member(member_id).await?.is_none() {
            return Err(IdentityError::Validation(format!(
                "Member {member_id} does not exist"
            )));
        }

        let owners = self.store.accounts_for_member(member_id).await?;
        if !owners.is_empty() {
            return Err(IdentityError::Validation(format!(
                "Member {member_id} is already linked to an account"
            )));
        }

        Ok(())
    }

    async fn unique_username_for(&self, full_name: &str) -> Result<String, IdentityError> {
        let base = derive_username(full_name);

        if !self.store.username_exists(&base).await? {
            return Ok(base);
        }

        let mut suffix: u32 = 1;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.store.username_exists(&candidate).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

impl From<VaultError> for IdentityError {
    fn from(err: VaultError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait]
impl IdentityService for SeaOrmIdentityService {
    async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
        client: ClientInfo,
    ) -> Result<AccountProfile, IdentityError> {
        let client_info = client.summary();

        let Some(account) = self.store.get_account_by_identifier(identifier).await? else {
            // Unknown identifier: log without an account id and answer with
            // the same failure a wrong password gets.
            self.audit
                .record(
                    SecurityEventKind::LoginFailure,
                    None,
                    false,
                    client_info,
                    Some(format!("Unknown identifier '{identifier}'")),
                )
                .await;
            return Err(IdentityError::InvalidCredentials);
        };

        if let Some(until) = SecuritySessionGuard::lockout_remaining(&account) {
            let until = until.to_rfc3339();
            self.audit
                .record(
                    SecurityEventKind::LoginFailure,
                    Some(account.id),
                    false,
                    client_info,
                    Some(format!("Rejected while locked until {until}")),
                )
                .await;
            return Err(IdentityError::AccountLocked { until });
        }

        if !self.vault.verify(password, &account.password_hash).await? {
            self.guard.record_failure(&account, client_info).await?;
            return Err(IdentityError::InvalidCredentials);
        }

        self.guard.record_success(&account, client_info).await?;

        // Re-read so the returned profile reflects the login just recorded.
        let account = self.store.get_account(account.id).await?.unwrap_or(account);

        self.profile_for(&account).await
    }

    async fn change_password(
        &self,
        account_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let account = self.load_account(account_id).await?;

        self.check_strength(new_password)?;

        // Forced initial change: the owner may not know the generated
        // password they were handed, so the current-password check is
        // skipped exactly while first_login is set.
        if !account.first_login {
            if !self
                .vault
                .verify(current_password, &account.password_hash)
                .await?
            {
                return Err(IdentityError::Validation(
                    "Current password is incorrect".to_string(),
                ));
            }

            if current_password == new_password {
                return Err(IdentityError::Validation(
                    "New password must be different from current password".to_string(),
                ));
            }
        }

        let (hash, salt) = self.vault.hash(new_password).await?;

        self.store
            .update_account_password(account.id, hash, salt, false, false)
            .await?;

        self.audit
            .record(
                SecurityEventKind::PasswordChange,
                Some(account.id),
                true,
                None,
                None,
            )
            .await;

        Ok(())
    }

    async fn change_username(
        &self,
        account_id: i32,
        new_username: &str,
    ) -> Result<AccountProfile, IdentityError> {
        let account = self.load_account(account_id).await?;

        if account.username_changed {
            return Err(IdentityError::UsernameAlreadyChanged);
        }

        if !username_regex().is_match(new_username) {
            return Err(IdentityError::Validation(
                "Username must be 3-20 characters of letters, digits, or underscore".to_string(),
            ));
        }

        if new_username != account.username && self.store.username_exists(new_username).await? {
            return Err(IdentityError::UsernameTaken);
        }

        let updated = self
            .store
            .update_account_username(account.id, new_username)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IdentityError::UsernameTaken
                } else {
                    IdentityError::Internal(e.to_string())
                }
            })?;

        self.audit
            .record(
                SecurityEventKind::UsernameChange,
                Some(account.id),
                true,
                None,
                Some(format!(
                    "Username changed from '{}' to '{new_username}'",
                    account.username
                )),
            )
            .await;

        self.profile_for(&updated).await
    }

    async fn update_settings(
        &self,
        account_id: i32,
        patch: AccountSettings,
    ) -> Result<AccountSettings, IdentityError> {
        let account = self.load_account(account_id).await?;

        let mut settings = AccountSettings::from_json(&account.settings_json)
            .map_err(|e| IdentityError::Internal(format!("Corrupt settings blob: {e}")))?;

        settings.merge(patch);

        let json = settings
            .to_json()
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        self.store.update_account_settings(account.id, json).await?;

        Ok(settings)
    }

    async fn admin_reset_password(
        &self,
        admin_id: i32,
        target_id: i32,
        new_password: Option<&str>,
    ) -> Result<String, IdentityError> {
        let admin = require_admin(&self.store, admin_id).await?;

        let target = self.load_account(target_id).await?;

        let password = match new_password {
            Some(supplied) => {
                self.check_strength(supplied)?;
                supplied.to_string()
            }
            None => self.vault.generate_password(),
        };

        let (hash, salt) = self.vault.hash(&password).await?;

        // first_login forces the owner to rotate this temporary password on
        // next use; password_generated marks it as one-time displayable.
        self.store
            .update_account_password(target.id, hash, salt, true, true)
            .await?;

        self.audit
            .record(
                SecurityEventKind::PasswordReset,
                Some(target.id),
                true,
                None,
                Some(format!("Password reset by admin '{}'", admin.username)),
            )
            .await;

        Ok(password)
    }

    async fn create_account(
        &self,
        data: NewAccount,
        created_by_admin_id: Option<i32>,
    ) -> Result<CreatedAccount, IdentityError> {
        let creator = match created_by_admin_id {
            Some(admin_id) => Some(require_admin(&self.store, admin_id).await?),
            None => None,
        };

        if !username_regex().is_match(&data.username) {
            return Err(IdentityError::Validation(
                "Username must be 3-20 characters of letters, digits, or underscore".to_string(),
            ));
        }

        if let Some(member_id) = data.member_id {
            self.ensure_member_unlinked(member_id).await?;
        }

        let generated = data.password.is_none();
        let password = match data.password {
            Some(supplied) => {
                self.check_strength(&supplied)?;
                supplied
            }
            None => self.vault.generate_password(),
        };

        let (hash, salt) = self.vault.hash(&password).await?;

        let role = data.role.unwrap_or(Role::Member);

        let account = self
            .store
            .create_account(CreateAccountRow {
                username: data.username,
                email: data.email,
                password_hash: hash,
                salt,
                role: role.as_str().to_string(),
                first_login: generated,
                password_generated: generated,
                member_id: data.member_id,
                settings_json: AccountSettings::default()
                    .to_json()
                    .map_err(|e| IdentityError::Internal(e.to_string()))?,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IdentityError::UsernameTaken
                } else {
                    IdentityError::Internal(e.to_string())
                }
            })?;

        self.audit
            .record(
                SecurityEventKind::AccountCreated,
                Some(account.id),
                true,
                None,
                creator.map(|admin| format!("Created by admin '{}'", admin.username)),
            )
            .await;

        let profile = self.profile_for(&account).await?;

        Ok(CreatedAccount {
            profile,
            temporary_password: generated.then_some(password),
        })
    }

    async fn create_account_from_member(
        &self,
        member_id: i32,
    ) -> Result<CreatedAccount, IdentityError> {
        let member = self
            .store
            .get_member(member_id)
            .await?
            .ok_or(IdentityError::NotFound)?;

        self.ensure_member_unlinked(member_id).await?;

        let username = self.unique_username_for(&member.full_name).await?;
        let password = self.vault.generate_password();
        let (hash, salt) = self.vault.hash(&password).await?;

        let account = self
            .store
            .create_account(CreateAccountRow {
                username,
                email: member.email.clone(),
                password_hash: hash,
                salt,
                role: Role::Member.as_str().to_string(),
                first_login: true,
                password_generated: true,
                member_id: Some(member.id),
                settings_json: AccountSettings::default()
                    .to_json()
                    .map_err(|e| IdentityError::Internal(e.to_string()))?,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    IdentityError::UsernameTaken
                } else {
                    IdentityError::Internal(e.to_string())
                }
            })?;

        self.audit
            .record(
                SecurityEventKind::AccountCreated,
                Some(account.id),
                true,
                None,
                Some(format!(
                    "Auto-provisioned for member '{}' ({})",
                    member.full_name, member.id
                )),
            )
            .await;

        let profile = self.profile_for(&account).await?;

        Ok(CreatedAccount {
            profile,
            temporary_password: Some(password),
        })
    }

    async fn security_log(
        &self,
        admin_id: i32,
        target_id: Option<i32>,
        limit: u64,
    ) -> Result<Vec<security_events::Model>, IdentityError> {
        match require_admin(&self.store, admin_id).await {
            Ok(_) => {}
            Err(e) => {
                self.audit
                    .record(
                        SecurityEventKind::UnauthorizedAccess,
                        Some(admin_id),
                        false,
                        None,
                        Some("Non-admin attempted to read the security log".to_string()),
                    )
                    .await;
                return Err(e.into());
            }
        }

        Ok(self.store.recent_security_events(target_id, limit).await?)
    }
}

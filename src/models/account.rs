use serde::{Deserialize, Serialize};

use crate::entities::{accounts, members};
use crate::models::settings::AccountSettings;

/// Account role. Persisted as a string in `accounts.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Unknown strings fall back to the least-privileged role.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Public view of an account, safe to return to callers.
/// Never carries the password hash or salt.
#[derive(Debug, Clone, Serialize)]
pub struct AccountProfile {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub first_login: bool,
    pub member_id: Option<i32>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub settings: AccountSettings,
    pub last_login: Option<String>,
}

impl AccountProfile {
    /// Builds the profile from an account row, merged with its linked
    /// member's contact fields. Member data wins over stale account copies.
    #[must_use]
    pub fn from_account(account: &accounts::Model, member: Option<&members::Model>) -> Self {
        let settings = AccountSettings::from_json(&account.settings_json).unwrap_or_default();

        let email = member
            .and_then(|m| m.email.clone())
            .or_else(|| account.email.clone());

        Self {
            id: account.id,
            username: account.username.clone(),
            email,
            role: Role::parse(&account.role),
            first_login: account.first_login,
            member_id: account.member_id,
            full_name: member.map(|m| m.full_name.clone()),
            phone: member.and_then(|m| m.phone.clone()),
            settings,
            last_login: account.last_login.clone(),
        }
    }
}

/// Input for creating an account directly.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: String,
    pub email: Option<String>,
    /// Caller-supplied password; a secure one is generated when absent.
    pub password: Option<String>,
    pub role: Option<Role>,
    pub member_id: Option<i32>,
}

/// Outcome of account creation. `temporary_password` is populated exactly
/// once, and only when the password was system-generated.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub profile: AccountProfile,
    pub temporary_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("member"), Role::Member);
        assert_eq!(Role::parse(Role::Admin.as_str()), Role::Admin);
    }

    #[test]
    fn test_unknown_role_defaults_to_member() {
        assert_eq!(Role::parse("superuser"), Role::Member);
    }
}

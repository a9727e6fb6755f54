//! Password hashing, strength policy, and secure random generation.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tokio::task;

use crate::config::SecurityConfig;

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_=+?";

const MIN_PASSWORD_LENGTH: usize = 8;
const USERNAME_MAX_LENGTH: usize = 20;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task panicked")]
    TaskJoin,
}

/// One unmet password requirement, surfaced verbatim to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRequirement {
    MinLength,
    LowercaseLetter,
    UppercaseLetter,
    Digit,
    Symbol,
}

impl PasswordRequirement {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::MinLength => "at least 8 characters",
            Self::LowercaseLetter => "at least one lowercase letter",
            Self::UppercaseLetter => "at least one uppercase letter",
            Self::Digit => "at least one digit",
            Self::Symbol => "at least one symbol",
        }
    }
}

/// Itemized strength verdict. Callers surface `unmet` to the user rather
/// than a bare pass/fail.
#[derive(Debug, Clone)]
pub struct PasswordStrength {
    pub valid: bool,
    /// 0–100, twenty points per satisfied requirement.
    pub score: u8,
    pub unmet: Vec<PasswordRequirement>,
}

#[derive(Clone)]
pub struct CredentialVault {
    config: SecurityConfig,
}

impl CredentialVault {
    #[must_use]
    pub const fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Hashes a password with Argon2id, returning the PHC string and the
    /// salt that went into it. Runs on a blocking thread; Argon2 is the one
    /// CPU-heavy step in the core.
    pub async fn hash(&self, password: &str) -> Result<(String, String), VaultError> {
        let password = password.to_string();
        let config = self.config.clone();

        task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .map_err(|_| VaultError::TaskJoin)?
    }

    /// Verifies a password against a stored PHC hash. A mismatch is
    /// `Ok(false)`, never an error.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, VaultError> {
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();

        task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| VaultError::MalformedHash(e.to_string()))?;

            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|_| VaultError::TaskJoin)?
    }

    /// Policy: length ≥ 8 and all four character classes present.
    #[must_use]
    pub fn validate_strength(&self, password: &str) -> PasswordStrength {
        let mut unmet = Vec::new();

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            unmet.push(PasswordRequirement::MinLength);
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            unmet.push(PasswordRequirement::LowercaseLetter);
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            unmet.push(PasswordRequirement::UppercaseLetter);
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            unmet.push(PasswordRequirement::Digit);
        }
        if !password.chars().any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace()) {
            unmet.push(PasswordRequirement::Symbol);
        }

        let score = (5 - unmet.len() as u8) * 20;

        PasswordStrength {
            valid: unmet.is_empty(),
            score,
            unmet,
        }
    }

    /// Generates a temporary password that always satisfies
    /// [`Self::validate_strength`]: one character from each required class,
    /// the remainder from the full alphabet, then a shuffle.
    #[must_use]
    pub fn generate_password(&self) -> String {
        use rand::Rng;
        use rand::seq::SliceRandom;

        let length = self.config.generated_password_length.clamp(10, 12);
        let mut rng = rand::rng();

        let full: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();

        let mut chars: Vec<u8> = vec![
            LOWERCASE[rng.random_range(0..LOWERCASE.len())],
            UPPERCASE[rng.random_range(0..UPPERCASE.len())],
            DIGITS[rng.random_range(0..DIGITS.len())],
            SYMBOLS[rng.random_range(0..SYMBOLS.len())],
        ];

        while chars.len() < length {
            chars.push(full[rng.random_range(0..full.len())]);
        }

        chars.shuffle(&mut rng);

        chars.into_iter().map(char::from).collect()
    }
}

fn hash_password(password: &str, config: &SecurityConfig) -> Result<(String, String), VaultError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| VaultError::InvalidParams(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VaultError::Hashing(e.to_string()))?;

    Ok((hash.to_string(), salt.to_string()))
}

/// Deterministic username base derived from a member's full name:
/// lowercased, whitespace runs become underscores, everything else
/// non-alphanumeric is dropped, clamped to 20 chars. Results shorter than
/// three characters get a `user` prefix. Uniqueness against existing
/// usernames is the caller's loop.
#[must_use]
pub fn derive_username(full_name: &str) -> String {
    let mut base = String::new();

    for token in full_name.split_whitespace() {
        let cleaned: String = token
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase();

        if cleaned.is_empty() {
            continue;
        }
        if !base.is_empty() {
            base.push('_');
        }
        base.push_str(&cleaned);
    }

    if base.len() < 3 {
        base = format!("user{base}");
    }

    base.truncate(USERNAME_MAX_LENGTH);
    base
}

pub mod audit;
pub use audit::{AccessAudit, SecurityEventKind};

pub mod authz;
pub use authz::require_admin;

pub mod credential_vault;
pub use credential_vault::{CredentialVault, PasswordRequirement, PasswordStrength, VaultError};

pub mod session_guard;
pub use session_guard::SecuritySessionGuard;

pub mod identity_service;
pub use identity_service::{ClientInfo, IdentityError, IdentityService};

pub mod identity_service_impl;
pub use identity_service_impl::SeaOrmIdentityService;

pub mod consistency_service;
pub use consistency_service::{
    CascadeOutcome, ConsistencyEngine, ConsistencyError, ConsistencyIssue, ConsistencyReport,
    ConsistencyStatus, IssueKind, LinkageCheck,
};

pub mod consistency_service_impl;
pub use consistency_service_impl::SeaOrmConsistencyEngine;

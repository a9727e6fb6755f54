use sea_orm::{ConnectionTrait, Statement};

use rosterr::config::SecurityConfig;
use rosterr::db::repositories::lookup;
use rosterr::db::{CreateAccountRow, Store};
use rosterr::models::{MemberInput, NewAccount, Role};
use rosterr::services::{
    ConsistencyEngine, ConsistencyError, ConsistencyStatus, IdentityService, IssueKind,
    SeaOrmConsistencyEngine, SeaOrmIdentityService,
};

const STRONG_PASSWORD: &str = "Str0ng!pass";

async fn spawn_store() -> Store {
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to create in-memory store")
}

async fn spawn_core() -> (Store, SeaOrmIdentityService, SeaOrmConsistencyEngine) {
    let store = spawn_store().await;
    let identity = SeaOrmIdentityService::new(store.clone(), &SecurityConfig::default());
    let engine = SeaOrmConsistencyEngine::new(store.clone());
    (store, identity, engine)
}

/// Creates an admin account named "root" for cascade authorization.
async fn create_root_admin(identity: &SeaOrmIdentityService) -> i32 {
    identity
        .create_account(
            NewAccount {
                username: "root".to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                role: Some(Role::Admin),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("Failed to create root admin")
        .profile
        .id
}

/// Member with a branch, industry, company, and skills, plus an owning
/// account, mirroring a fully populated portal profile.
async fn create_linked_member(
    store: &Store,
    identity: &SeaOrmIdentityService,
    full_name: &str,
    branch: &str,
    skills: &[&str],
) -> (i32, i32) {
    let member = store
        .create_member(&MemberInput {
            full_name: full_name.to_string(),
            branch: Some(branch.to_string()),
            industry: Some("Engineering".to_string()),
            company: Some("Initech".to_string()),
            skills: skills.iter().map(ToString::to_string).collect(),
            ..Default::default()
        })
        .await
        .expect("Failed to create member");

    let account = identity
        .create_account_from_member(member.id)
        .await
        .expect("Failed to provision account");

    (account.profile.id, member.id)
}

#[tokio::test]
async fn test_clean_store_passes_consistency() {
    let (_store, _identity, engine) = spawn_core().await;

    let report = engine.check_consistency().await.unwrap();

    assert_eq!(report.status, ConsistencyStatus::Passed);
    assert!(report.issues.is_empty());
    // Only the seeded admin exists, and it owns no member profile.
    assert_eq!(report.statistics.total_accounts, 1);
    assert_eq!(report.statistics.total_members, 0);
    assert_eq!(report.statistics.unlinked_accounts, 1);
}

#[tokio::test]
async fn test_cascade_reclaims_exclusive_lookups() {
    let (store, identity, engine) = spawn_core().await;
    let root_id = create_root_admin(&identity).await;

    // Branch "Robotics" and skill "Rust" are referenced only by bob's member.
    let (bob_account, bob_member) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &["Rust"]).await;

    let outcome = engine
        .cascade_delete_account(bob_account, root_id)
        .await
        .unwrap();

    assert_eq!(outcome.deleted_username, "bob_martin");
    assert_eq!(outcome.deleted_member.as_ref().map(|m| m.id), Some(bob_member));
    assert_eq!(outcome.removed_branch.as_deref(), Some("Robotics"));
    assert_eq!(outcome.removed_skills, vec!["Rust".to_string()]);
    assert!(outcome.consistency.passed());

    assert!(store.get_account(bob_account).await.unwrap().is_none());
    assert!(store.get_member(bob_member).await.unwrap().is_none());
    assert!(store.get_branch_by_name("Robotics").await.unwrap().is_none());
    assert!(store.get_skill_by_name("Rust").await.unwrap().is_none());

    // Exactly one cascade_delete event, referencing the acting admin.
    let events = store.recent_security_events(None, 100).await.unwrap();
    let cascades: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == "cascade_delete")
        .collect();
    assert_eq!(cascades.len(), 1);
    assert_eq!(cascades[0].account_id, Some(root_id));
    assert!(cascades[0].success);
}

#[tokio::test]
async fn test_cascade_never_removes_shared_lookups() {
    let (store, identity, engine) = spawn_core().await;
    let root_id = create_root_admin(&identity).await;

    let (bob_account, _) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &["Rust", "C"]).await;
    let (_, _) =
        create_linked_member(&store, &identity, "Eve Adams", "Robotics", &["Rust"]).await;

    let outcome = engine
        .cascade_delete_account(bob_account, root_id)
        .await
        .unwrap();

    // "Robotics" and "Rust" survive via Eve; only "C" became orphaned.
    assert_eq!(outcome.removed_branch, None);
    assert_eq!(outcome.removed_skills, vec!["C".to_string()]);
    assert!(store.get_branch_by_name("Robotics").await.unwrap().is_some());
    assert!(store.get_skill_by_name("Rust").await.unwrap().is_some());
    assert!(store.get_skill_by_name("C").await.unwrap().is_none());
    assert!(outcome.consistency.passed());
}

#[tokio::test]
async fn test_cascade_on_memberless_account_skips_member_steps() {
    let (store, identity, engine) = spawn_core().await;
    let root_id = create_root_admin(&identity).await;

    let account = identity
        .create_account(
            NewAccount {
                username: "floating".to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let outcome = engine
        .cascade_delete_account(account.profile.id, root_id)
        .await
        .unwrap();

    assert!(outcome.deleted_member.is_none());
    assert_eq!(outcome.removed_branch, None);
    assert!(outcome.removed_skills.is_empty());
    assert!(store.get_account(account.profile.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cascade_authorization_is_checked_before_any_write() {
    let (store, identity, engine) = spawn_core().await;

    let (bob_account, bob_member) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &["Rust"]).await;
    let (eve_account, _) =
        create_linked_member(&store, &identity, "Eve Adams", "Marketing", &[]).await;

    // Eve holds the member role; the gate rejects before anything mutates.
    let err = engine
        .cascade_delete_account(bob_account, eve_account)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsistencyError::Unauthorized));

    assert!(store.get_account(bob_account).await.unwrap().is_some());
    assert!(store.get_member(bob_member).await.unwrap().is_some());
    assert!(store.get_branch_by_name("Robotics").await.unwrap().is_some());
}

#[tokio::test]
async fn test_cascade_unknown_account_is_not_found() {
    let (_store, identity, engine) = spawn_core().await;
    let root_id = create_root_admin(&identity).await;

    let err = engine.cascade_delete_account(99999, root_id).await.unwrap_err();
    assert!(matches!(err, ConsistencyError::NotFound));
}

#[tokio::test]
async fn test_cleanup_orphaned_lookups_is_idempotent() {
    let (store, _identity, engine) = spawn_core().await;

    // Lookup rows with no referencing members.
    lookup::get_or_create_branch(&store.conn, "Ghost Branch")
        .await
        .unwrap();
    lookup::get_or_create_industry(&store.conn, "Ghost Industry")
        .await
        .unwrap();
    lookup::get_or_create_skill(&store.conn, "Ghost Skill")
        .await
        .unwrap();

    let first = engine.cleanup_orphaned_lookups().await.unwrap();
    assert_eq!(first.branches_removed, 1);
    assert_eq!(first.industries_removed, 1);
    assert_eq!(first.skills_removed, 1);

    // Second run with no intervening writes removes nothing.
    let second = engine.cleanup_orphaned_lookups().await.unwrap();
    assert_eq!(second.total(), 0);
}

#[tokio::test]
async fn test_cleanup_keeps_referenced_lookups() {
    let (store, identity, engine) = spawn_core().await;

    create_linked_member(&store, &identity, "Bob Martin", "Robotics", &["Rust"]).await;
    lookup::get_or_create_branch(&store.conn, "Ghost Branch")
        .await
        .unwrap();

    let sweep = engine.cleanup_orphaned_lookups().await.unwrap();
    assert_eq!(sweep.branches_removed, 1);

    assert!(store.get_branch_by_name("Robotics").await.unwrap().is_some());
    assert!(store.get_skill_by_name("Rust").await.unwrap().is_some());
    assert!(store.get_branch_by_name("Ghost Branch").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unlinked_member_is_reported() {
    let (store, _identity, engine) = spawn_core().await;

    let member = store
        .create_member(&MemberInput {
            full_name: "Orphan Profile".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let report = engine.check_consistency().await.unwrap();

    assert_eq!(report.status, ConsistencyStatus::Failed);
    assert!(report.issues.iter().any(|issue| {
        issue.kind == IssueKind::UnlinkedMember && issue.member_id == Some(member.id)
    }));
}

#[tokio::test]
async fn test_duplicate_linkage_is_reported() {
    let (store, identity, engine) = spawn_core().await;

    let (_, member_id) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &[]).await;

    // The service layer refuses a second claim, so manufacture the
    // corruption at the row level the way a buggy import would.
    store
        .create_account(CreateAccountRow {
            username: "second_claim".to_string(),
            email: None,
            password_hash: "x".to_string(),
            salt: "x".to_string(),
            role: "member".to_string(),
            first_login: false,
            password_generated: false,
            member_id: Some(member_id),
            settings_json: "{}".to_string(),
        })
        .await
        .unwrap();

    let report = engine.check_consistency().await.unwrap();

    assert_eq!(report.status, ConsistencyStatus::Failed);
    assert!(report.issues.iter().any(|issue| {
        issue.kind == IssueKind::DuplicateLink && issue.member_id == Some(member_id)
    }));
}

#[tokio::test]
async fn test_dangling_member_reference_is_reported() {
    let (store, identity, engine) = spawn_core().await;

    let (account_id, member_id) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &[]).await;

    // Simulate external corruption: drop the member row with constraint
    // enforcement off, leaving the account's reference dangling.
    let backend = store.conn.get_database_backend();
    store
        .conn
        .execute(Statement::from_string(
            backend,
            "PRAGMA foreign_keys = OFF".to_string(),
        ))
        .await
        .unwrap();
    store
        .conn
        .execute(Statement::from_string(
            backend,
            format!("DELETE FROM member_skills WHERE member_id = {member_id}"),
        ))
        .await
        .unwrap();
    store
        .conn
        .execute(Statement::from_string(
            backend,
            format!("DELETE FROM members WHERE id = {member_id}"),
        ))
        .await
        .unwrap();

    let report = engine.check_consistency().await.unwrap();

    assert_eq!(report.status, ConsistencyStatus::Failed);
    assert!(report.issues.iter().any(|issue| {
        issue.kind == IssueKind::MissingMember
            && issue.account_id == Some(account_id)
            && issue.member_id == Some(member_id)
    }));
}

#[tokio::test]
async fn test_validate_linkage_happy_path() {
    let (store, identity, engine) = spawn_core().await;

    let (account_id, member_id) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &[]).await;

    let check = engine.validate_linkage(member_id, account_id).await.unwrap();
    assert!(check.valid);
    assert!(check.issues.is_empty());
}

#[tokio::test]
async fn test_validate_linkage_flags_wrong_pairing() {
    let (store, identity, engine) = spawn_core().await;

    let (_, bob_member) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &[]).await;
    let (eve_account, _) =
        create_linked_member(&store, &identity, "Eve Adams", "Marketing", &[]).await;

    let check = engine.validate_linkage(bob_member, eve_account).await.unwrap();
    assert!(!check.valid);
    assert!(!check.issues.is_empty());
}

#[tokio::test]
async fn test_remove_unlinked_member_refuses_linked_profiles() {
    let (store, identity, _engine) = spawn_core().await;

    let (_, member_id) =
        create_linked_member(&store, &identity, "Bob Martin", "Robotics", &[]).await;

    let err = store.remove_unlinked_member(member_id).await.unwrap_err();
    assert!(err.to_string().contains("cascade-delete"));
}

#[tokio::test]
async fn test_remove_unlinked_member_reclaims_lookups() {
    let (store, _identity, engine) = spawn_core().await;

    let member = store
        .create_member(&MemberInput {
            full_name: "Solo Profile".to_string(),
            branch: Some("Aviation".to_string()),
            skills: vec!["Avionics".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let removal = store
        .remove_unlinked_member(member.id)
        .await
        .unwrap()
        .expect("member should exist");

    assert_eq!(removal.removed_branch.as_deref(), Some("Aviation"));
    assert_eq!(removal.removed_skills, vec!["Avionics".to_string()]);
    assert!(store.get_member(member.id).await.unwrap().is_none());

    let report = engine.check_consistency().await.unwrap();
    assert!(report.passed());
}

#[tokio::test]
async fn test_get_or_create_deduplicates_lookups() {
    let (store, _identity, _engine) = spawn_core().await;

    let first = lookup::get_or_create_branch(&store.conn, "Robotics").await.unwrap();
    let second = lookup::get_or_create_branch(&store.conn, "Robotics").await.unwrap();

    assert_eq!(first, second);
}

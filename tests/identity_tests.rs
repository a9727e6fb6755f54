use rosterr::config::SecurityConfig;
use rosterr::db::Store;
use rosterr::models::{AccountSettings, MemberInput, NewAccount, Role};
use rosterr::services::{
    ClientInfo, IdentityError, IdentityService, SeaOrmIdentityService,
};

/// Username and password of the account seeded by the initial migration.
const SEEDED_ADMIN: &str = "admin";
const SEEDED_ADMIN_PASSWORD: &str = "admin";

const STRONG_PASSWORD: &str = "Str0ng!pass";

/// Single-connection in-memory store: one writer, fully serialized, the
/// same execution model the core assumes in production.
async fn spawn_store() -> Store {
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to create in-memory store")
}

async fn spawn_identity() -> (Store, SeaOrmIdentityService) {
    let store = spawn_store().await;
    let identity = SeaOrmIdentityService::new(store.clone(), &SecurityConfig::default());
    (store, identity)
}

async fn create_member_account(
    identity: &SeaOrmIdentityService,
    username: &str,
) -> rosterr::models::AccountProfile {
    identity
        .create_account(
            NewAccount {
                username: username.to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .expect("Failed to create account")
        .profile
}

#[tokio::test]
async fn test_authenticate_by_username_and_email() {
    let (_store, identity) = spawn_identity().await;

    identity
        .create_account(
            NewAccount {
                username: "carol".to_string(),
                email: Some("carol@example.org".to_string()),
                password: Some(STRONG_PASSWORD.to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let by_username = identity
        .authenticate("carol", STRONG_PASSWORD, ClientInfo::default())
        .await
        .unwrap();
    assert_eq!(by_username.username, "carol");
    assert!(by_username.last_login.is_some());

    let by_email = identity
        .authenticate("carol@example.org", STRONG_PASSWORD, ClientInfo::default())
        .await
        .unwrap();
    assert_eq!(by_email.id, by_username.id);
}

#[tokio::test]
async fn test_unknown_identifier_looks_like_wrong_password() {
    let (store, identity) = spawn_identity().await;

    let err = identity
        .authenticate("nobody", "whatever", ClientInfo::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));

    // The failure is logged without an account id.
    let events = store.recent_security_events(None, 10).await.unwrap();
    let failure = events
        .iter()
        .find(|e| e.event_type == "login_failure")
        .expect("login failure not audited");
    assert_eq!(failure.account_id, None);
    assert!(!failure.success);
}

#[tokio::test]
async fn test_profile_merges_member_contact_fields() {
    let (store, identity) = spawn_identity().await;

    let member = store
        .create_member(&MemberInput {
            full_name: "Jane Doe".to_string(),
            email: Some("jane@alumni.example".to_string()),
            phone: Some("555-0101".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let created = identity.create_account_from_member(member.id).await.unwrap();
    let password = created
        .temporary_password
        .expect("auto-provisioned account must surface its temporary password");
    assert_eq!(created.profile.username, "jane_doe");

    let profile = identity
        .authenticate("jane_doe", &password, ClientInfo::default())
        .await
        .unwrap();

    // Member data wins over any stale account copy.
    assert_eq!(profile.email.as_deref(), Some("jane@alumni.example"));
    assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(profile.phone.as_deref(), Some("555-0101"));
    assert_eq!(profile.member_id, Some(member.id));
    assert!(profile.first_login);
}

#[tokio::test]
async fn test_derived_usernames_stay_unique() {
    let (store, identity) = spawn_identity().await;

    let first = store
        .create_member(&MemberInput {
            full_name: "Jane Doe".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = store
        .create_member(&MemberInput {
            full_name: "Jane Doe".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let a = identity.create_account_from_member(first.id).await.unwrap();
    let b = identity.create_account_from_member(second.id).await.unwrap();

    assert_eq!(a.profile.username, "jane_doe");
    assert_eq!(b.profile.username, "jane_doe1");
}

#[tokio::test]
async fn test_lockout_after_five_failures() {
    let (store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    for _ in 0..5 {
        let err = identity
            .authenticate("alice", "wrong-password", ClientInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    // Sixth attempt with the CORRECT password is still refused, and the
    // refusal names the unlock time rather than "invalid credentials".
    let err = identity
        .authenticate("alice", STRONG_PASSWORD, ClientInfo::default())
        .await
        .unwrap_err();
    match err {
        IdentityError::AccountLocked { until } => assert!(!until.is_empty()),
        other => panic!("expected AccountLocked, got {other:?}"),
    }

    let account = store.get_account(profile.id).await.unwrap().unwrap();
    assert_eq!(account.failed_attempts, 5);
    assert!(account.locked_until.is_some());

    // The lock transition itself was audited.
    let events = store
        .recent_security_events(Some(profile.id), 20)
        .await
        .unwrap();
    assert_eq!(
        events
            .iter()
            .filter(|e| e.event_type == "account_locked")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_successful_login_resets_failure_counter() {
    let (store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    for _ in 0..3 {
        let _ = identity
            .authenticate("alice", "wrong-password", ClientInfo::default())
            .await;
    }

    identity
        .authenticate("alice", STRONG_PASSWORD, ClientInfo::default())
        .await
        .unwrap();

    let account = store.get_account(profile.id).await.unwrap().unwrap();
    assert_eq!(account.failed_attempts, 0);
    assert_eq!(account.locked_until, None);
}

#[tokio::test]
async fn test_concurrent_failures_observe_lock_consistently() {
    let (store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    for _ in 0..4 {
        let _ = identity
            .authenticate("alice", "wrong-password", ClientInfo::default())
            .await;
    }

    // Two racing wrong-password attempts: counting happens inside one
    // store transaction, so neither update may be lost.
    let (a, b) = tokio::join!(
        identity.authenticate("alice", "wrong-password", ClientInfo::default()),
        identity.authenticate("alice", "wrong-password", ClientInfo::default()),
    );
    assert!(a.is_err());
    assert!(b.is_err());

    let account = store.get_account(profile.id).await.unwrap().unwrap();
    assert!(account.failed_attempts >= 5);
    assert!(account.locked_until.is_some());

    let err = identity
        .authenticate("alice", STRONG_PASSWORD, ClientInfo::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AccountLocked { .. }));
}

#[tokio::test]
async fn test_change_password_rejects_weak_with_itemized_feedback() {
    let (_store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    let err = identity
        .change_password(profile.id, STRONG_PASSWORD, "abc")
        .await
        .unwrap_err();

    match err {
        IdentityError::WeakPassword(reasons) => {
            assert!(reasons.iter().any(|r| r.contains("8 characters")));
            assert!(reasons.iter().any(|r| r.contains("uppercase")));
        }
        other => panic!("expected WeakPassword, got {other:?}"),
    }
}

#[tokio::test]
async fn test_change_password_requires_correct_current() {
    let (_store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    let err = identity
        .change_password(profile.id, "not-the-password", "N3w!secret9")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Validation(_)));

    identity
        .change_password(profile.id, STRONG_PASSWORD, "N3w!secret9")
        .await
        .unwrap();

    identity
        .authenticate("alice", "N3w!secret9", ClientInfo::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_first_login_skips_current_password_check() {
    let (store, identity) = spawn_identity().await;

    let admin_id = store
        .get_account_by_username(SEEDED_ADMIN)
        .await
        .unwrap()
        .unwrap()
        .id;

    // The seeded admin carries first_login = true.
    identity
        .change_password(admin_id, "", "N3w!secret9")
        .await
        .unwrap();

    let admin = store.get_account_by_username(SEEDED_ADMIN).await.unwrap().unwrap();
    assert!(!admin.first_login);
    assert!(!admin.password_generated);

    // With the flag cleared, the current password is enforced again.
    let err = identity
        .change_password(admin.id, "bogus", "An0ther!pass")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Validation(_)));
}

#[tokio::test]
async fn test_username_change_is_one_time() {
    let (store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    let updated = identity
        .change_username(profile.id, "alice_2026")
        .await
        .unwrap();
    assert_eq!(updated.username, "alice_2026");

    let account = store.get_account(profile.id).await.unwrap().unwrap();
    assert!(account.username_changed);

    // A second change fails regardless of the requested value.
    let err = identity
        .change_username(profile.id, "alice_again")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UsernameAlreadyChanged));
}

#[tokio::test]
async fn test_username_change_validates_format_and_uniqueness() {
    let (_store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;
    create_member_account(&identity, "bob").await;

    let err = identity.change_username(profile.id, "a!").await.unwrap_err();
    assert!(matches!(err, IdentityError::Validation(_)));

    let err = identity.change_username(profile.id, "bob").await.unwrap_err();
    assert!(matches!(err, IdentityError::UsernameTaken));

    // Neither failed attempt consumed the one-time change.
    identity.change_username(profile.id, "alice_ok").await.unwrap();
}

#[tokio::test]
async fn test_settings_update_is_a_sparse_patch() {
    let (_store, identity) = spawn_identity().await;
    let profile = create_member_account(&identity, "alice").await;

    identity
        .update_settings(
            profile.id,
            AccountSettings {
                theme: Some("dark".to_string()),
                email_notifications: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let merged = identity
        .update_settings(
            profile.id,
            AccountSettings {
                language: Some("en".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(merged.theme.as_deref(), Some("dark"));
    assert_eq!(merged.email_notifications, Some(true));
    assert_eq!(merged.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn test_admin_reset_password_flow() {
    let (store, identity) = spawn_identity().await;
    let target = create_member_account(&identity, "alice").await;

    let admin = store.get_account_by_username(SEEDED_ADMIN).await.unwrap().unwrap();

    let temporary = identity
        .admin_reset_password(admin.id, target.id, None)
        .await
        .unwrap();

    let account = store.get_account(target.id).await.unwrap().unwrap();
    assert!(account.first_login);
    assert!(account.password_generated);
    // Only the hash is persisted.
    assert_ne!(account.password_hash, temporary);

    // The temporary password works, and the profile advertises the forced change.
    let profile = identity
        .authenticate("alice", &temporary, ClientInfo::default())
        .await
        .unwrap();
    assert!(profile.first_login);
}

#[tokio::test]
async fn test_admin_reset_requires_admin_role() {
    let (_store, identity) = spawn_identity().await;
    let member = create_member_account(&identity, "alice").await;
    let target = create_member_account(&identity, "bob").await;

    let err = identity
        .admin_reset_password(member.id, target.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Unauthorized));
}

#[tokio::test]
async fn test_created_account_surfaces_generated_password_once() {
    let (_store, identity) = spawn_identity().await;

    let generated = identity
        .create_account(
            NewAccount {
                username: "provisioned".to_string(),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert!(generated.temporary_password.is_some());
    assert!(generated.profile.first_login);

    let supplied = identity
        .create_account(
            NewAccount {
                username: "selfserve".to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert!(supplied.temporary_password.is_none());
    assert!(!supplied.profile.first_login);
}

#[tokio::test]
async fn test_duplicate_username_is_a_typed_error() {
    let (_store, identity) = spawn_identity().await;
    create_member_account(&identity, "alice").await;

    let err = identity
        .create_account(
            NewAccount {
                username: "alice".to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UsernameTaken));
}

#[tokio::test]
async fn test_account_cannot_claim_linked_member() {
    let (store, identity) = spawn_identity().await;

    let member = store
        .create_member(&MemberInput {
            full_name: "Jane Doe".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    identity.create_account_from_member(member.id).await.unwrap();

    let err = identity
        .create_account(
            NewAccount {
                username: "second_claim".to_string(),
                password: Some(STRONG_PASSWORD.to_string()),
                member_id: Some(member.id),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Validation(_)));
}

#[tokio::test]
async fn test_security_log_is_admin_gated() {
    let (store, identity) = spawn_identity().await;
    let member = create_member_account(&identity, "alice").await;

    let err = identity.security_log(member.id, None, 10).await.unwrap_err();
    assert!(matches!(err, IdentityError::Unauthorized));

    let admin = store.get_account_by_username(SEEDED_ADMIN).await.unwrap().unwrap();
    let events = identity.security_log(admin.id, None, 50).await.unwrap();

    // At minimum the account creation above was audited.
    assert!(events.iter().any(|e| e.event_type == "account_created"));
}

#[tokio::test]
async fn test_seeded_admin_can_authenticate() {
    let (_store, identity) = spawn_identity().await;

    let profile = identity
        .authenticate(SEEDED_ADMIN, SEEDED_ADMIN_PASSWORD, ClientInfo::default())
        .await
        .unwrap();

    assert_eq!(profile.role, Role::Admin);
    assert!(profile.first_login);
}

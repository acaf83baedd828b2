//! Storage layer tests for moderation.
#![allow(clippy::unwrap_used)]

use super::db::ModerationDatabase;
use super::models::*;
use super::queries_users::{BanLiftParams, BanParams, RestrictionParams};

const CREATED_AT: i64 = 500;

async fn test_db() -> ModerationDatabase {
    ModerationDatabase::open_in_memory().await.unwrap()
}

async fn alice(db: &ModerationDatabase) -> UserAccount {
    db.create_user(
        &NewUser {
            id: "u1",
            display_name: Some("Alice"),
            profile_image: Some("https://img.example/alice.png"),
        },
        CREATED_AT,
    )
    .await
    .unwrap()
}

fn ban_params(revision: i64) -> BanParams<'static> {
    BanParams {
        user_id: "u1",
        expected_revision: revision,
        now: 1_000,
        banned_by: "admin-1",
        duration_days: 3,
        expires_at: 1_000 + 3 * 86_400,
        archived_display_name: Some("Alice"),
        archived_profile_image: Some("https://img.example/alice.png"),
        archived_at: 1_000,
        archived_status: AccountStatus::Active,
    }
}

fn lift_params(revision: i64, status: AccountStatus) -> BanLiftParams<'static> {
    BanLiftParams {
        user_id: "u1",
        expected_revision: revision,
        now: 2_000,
        display_name: Some("Alice"),
        profile_image: Some("https://img.example/alice.png"),
        status,
    }
}

/// Make every content update fail so the visibility cascade errors.
async fn break_content_updates(db: &ModerationDatabase) {
    sqlx::query(
        "CREATE TRIGGER reject_content_updates BEFORE UPDATE ON content_items \
         BEGIN SELECT RAISE(ABORT, 'content locked'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();
}

// === Attempt ledger tests ===

#[tokio::test]
async fn insert_and_list_attempts_in_time_order() {
    let db = test_db().await;

    db.insert_attempt(ActionKind::Login, "a@example.com", Some(false), 300)
        .await
        .unwrap();
    db.insert_attempt(ActionKind::Login, "a@example.com", Some(true), 100)
        .await
        .unwrap();
    db.insert_attempt(ActionKind::Signup, "a@example.com", Some(false), 200)
        .await
        .unwrap();

    let records = db
        .list_attempts(ActionKind::Login, "a@example.com")
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].occurred_at, 100);
    assert_eq!(records[0].success, Some(true));
    assert!(records[1].is_failure());
}

#[tokio::test]
async fn delete_failed_attempts_keeps_successes() {
    let db = test_db().await;

    db.insert_attempt(ActionKind::Signup, "b@example.com", Some(false), 1)
        .await
        .unwrap();
    db.insert_attempt(ActionKind::Signup, "b@example.com", None, 2)
        .await
        .unwrap();
    db.insert_attempt(ActionKind::Signup, "b@example.com", Some(true), 3)
        .await
        .unwrap();

    let removed = db
        .delete_failed_attempts(ActionKind::Signup, "b@example.com")
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let remaining = db
        .list_attempts(ActionKind::Signup, "b@example.com")
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].success, Some(true));
}

#[tokio::test]
async fn delete_failed_attempts_without_failures_is_silent() {
    let db = test_db().await;
    db.insert_attempt(ActionKind::Login, "c@example.com", Some(true), 1)
        .await
        .unwrap();

    let mut feed = db.subscribe_ledger();
    let removed = db
        .delete_failed_attempts(ActionKind::Login, "c@example.com")
        .await
        .unwrap();

    assert_eq!(removed, 0);
    assert!(feed.try_recv().is_err(), "no change should be published");
}

#[tokio::test]
async fn ledger_feed_publishes_inserts() {
    let db = test_db().await;
    let mut feed = db.subscribe_ledger();

    db.insert_attempt(ActionKind::EmailVerification, "d@example.com", Some(false), 1)
        .await
        .unwrap();

    let change = feed.try_recv().unwrap();
    assert_eq!(change.action, ActionKind::EmailVerification);
    assert_eq!(change.identifier, "d@example.com");
}

#[tokio::test]
async fn closed_database_rejects_queries() {
    let db = test_db().await;
    db.close().await;

    assert!(db.is_closed());
    assert!(
        db.list_attempts(ActionKind::Login, "x@example.com")
            .await
            .is_err()
    );
}

// === User tests ===

#[tokio::test]
async fn create_and_get_user() {
    let db = test_db().await;
    let user = alice(&db).await;

    assert_eq!(user.id, "u1");
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
    assert_eq!(user.status, AccountStatus::Active);
    assert!(user.is_profile_visible);
    assert!(!user.chat_restricted);
    assert_eq!(user.revision, 0);
    assert_eq!(user.created_at, CREATED_AT);
    assert_eq!(user.updated_at, CREATED_AT);
    assert!(user.archived_profile().is_none());

    assert!(db.get_user("nobody").await.is_err());
}

#[tokio::test]
async fn commit_ban_archives_profile_and_hides_content() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();
    db.create_content("pet1", "u1", ContentKind::Pet, CREATED_AT).await.unwrap();
    db.create_content("p2", "u2", ContentKind::Post, CREATED_AT).await.unwrap();

    let outcome = db.commit_ban(&ban_params(0)).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Applied { content_rows: 2 });

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Banned);
    assert_eq!(user.display_name, None);
    assert_eq!(user.profile_image, None);
    assert!(!user.is_profile_visible);
    assert_eq!(user.ban_expires_at, Some(1_000 + 3 * 86_400));
    assert_eq!(user.banned_by.as_deref(), Some("admin-1"));
    assert_eq!(user.revision, 1);

    let archive = user.archived_profile().unwrap();
    assert_eq!(archive.display_name.as_deref(), Some("Alice"));
    assert_eq!(archive.archived_at, 1_000);
    assert_eq!(archive.status, AccountStatus::Active);

    assert!(db.get_content("p1").await.unwrap().is_hidden);
    assert!(db.get_content("pet1").await.unwrap().is_hidden);
    assert!(!db.get_content("p2").await.unwrap().is_hidden);
}

#[tokio::test]
async fn commit_ban_with_stale_revision_conflicts() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();

    let outcome = db.commit_ban(&ban_params(7)).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Conflict);

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Active);
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
    assert!(!db.get_content("p1").await.unwrap().is_hidden);
}

#[tokio::test]
async fn commit_ban_lift_restores_and_unhides() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();
    db.commit_ban(&ban_params(0)).await.unwrap();

    let outcome = db
        .commit_ban_lift(&lift_params(1, AccountStatus::Active))
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::Applied { content_rows: 1 });

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Active);
    assert_eq!(user.display_name.as_deref(), Some("Alice"));
    assert!(user.is_profile_visible);
    assert!(user.ban_expires_at.is_none());
    assert!(user.archived_profile().is_none());
    assert!(!db.get_content("p1").await.unwrap().is_hidden);
}

#[tokio::test]
async fn chat_restriction_roundtrip_leaves_content_alone() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();

    let outcome = db
        .commit_chat_restriction(&RestrictionParams {
            user_id: "u1",
            expected_revision: 0,
            now: 1_000,
            restricted_by: "admin-1",
            expires_at: 1_000 + 12 * 3_600,
            reason: "spam",
            duration: 12,
            unit: DurationUnit::Hours,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, CommitOutcome::Applied { .. }));

    let user = db.get_user("u1").await.unwrap();
    assert!(user.chat_restricted);
    assert_eq!(user.chat_restriction_reason.as_deref(), Some("spam"));
    assert_eq!(user.chat_restriction_duration_type, Some(DurationUnit::Hours));
    assert!(!db.get_content("p1").await.unwrap().is_hidden);

    let outcome = db
        .commit_chat_restriction_lift("u1", user.revision, 2_000)
        .await
        .unwrap();
    assert!(matches!(outcome, CommitOutcome::Applied { .. }));

    let user = db.get_user("u1").await.unwrap();
    assert!(!user.chat_restricted);
    assert!(user.chat_restriction_expires_at.is_none());
    assert!(user.chat_restriction_reason.is_none());
    assert!(user.chat_restriction_duration_type.is_none());
}

#[tokio::test]
async fn set_user_status_bumps_revision() {
    let db = test_db().await;
    alice(&db).await;

    assert!(
        db.set_user_status("u1", AccountStatus::Deactivated, 900)
            .await
            .unwrap()
    );
    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Deactivated);
    assert_eq!(user.revision, 1);
    assert_eq!(user.updated_at, 900);
}

#[tokio::test]
async fn ban_lift_restores_archived_status() {
    let db = test_db().await;
    alice(&db).await;
    db.set_user_status("u1", AccountStatus::Deactivated, 900)
        .await
        .unwrap();

    db.commit_ban(&BanParams {
        archived_status: AccountStatus::Deactivated,
        ..ban_params(1)
    })
    .await
    .unwrap();
    let banned = db.get_user("u1").await.unwrap();
    assert_eq!(banned.status, AccountStatus::Banned);
    assert_eq!(banned.archived_status, Some(AccountStatus::Deactivated));

    db.commit_ban_lift(&lift_params(2, AccountStatus::Deactivated))
        .await
        .unwrap();
    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Deactivated);
    assert!(user.archived_status.is_none());
}

#[tokio::test]
async fn failed_cascade_still_commits_ban() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();
    break_content_updates(&db).await;

    let outcome = db.commit_ban(&ban_params(0)).await.unwrap();
    assert_eq!(outcome, CommitOutcome::Applied { content_rows: 0 });

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Banned);
    assert!(user.archived_profile().is_some());
    assert!(!db.get_content("p1").await.unwrap().is_hidden);
}

#[tokio::test]
async fn failed_cascade_still_commits_ban_lift() {
    let db = test_db().await;
    alice(&db).await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();
    db.commit_ban(&ban_params(0)).await.unwrap();
    break_content_updates(&db).await;

    let outcome = db
        .commit_ban_lift(&lift_params(1, AccountStatus::Active))
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::Applied { content_rows: 0 });

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.status, AccountStatus::Active);
    assert!(user.archived_profile().is_none());
    assert!(db.get_content("p1").await.unwrap().is_hidden);
}

// === Content tests ===

#[tokio::test]
async fn list_content_for_owner() {
    let db = test_db().await;
    db.create_content("p1", "u1", ContentKind::Post, CREATED_AT).await.unwrap();
    db.create_content("pet1", "u1", ContentKind::Pet, CREATED_AT).await.unwrap();
    db.create_content("p2", "u2", ContentKind::Post, CREATED_AT).await.unwrap();

    let items = db.list_content_for_owner("u1").await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.created_at == CREATED_AT));
    assert!(items.iter().all(|i| i.owner_id == "u1" && !i.is_hidden));
}

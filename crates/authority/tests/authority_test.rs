use authority::{
    MemoryCodeStore, MemoryOwnerDirectory, OwnerProfile, TransferCodeAuthority,
};
use chrono::{Duration, Utc};
use shared::config::AuthorityConfig;
use shared::models::RedemptionStatus;
use std::sync::Arc;

async fn seeded_authority() -> (Arc<TransferCodeAuthority>, Arc<MemoryCodeStore>, Arc<MemoryOwnerDirectory>) {
    let store = Arc::new(MemoryCodeStore::new());
    let directory = Arc::new(MemoryOwnerDirectory::new());
    directory
        .insert(OwnerProfile {
            owner_id: "owner-1".to_string(),
            display_name: "Kim Cheolsu".to_string(),
            secret: "CUST0001".to_string(),
            active: true,
        })
        .await;

    let authority = Arc::new(TransferCodeAuthority::new(
        store.clone(),
        directory.clone(),
        AuthorityConfig::default(),
    ));
    (authority, store, directory)
}

#[tokio::test]
async fn issue_returns_a_masked_grant() {
    let (authority, _, _) = seeded_authority().await;

    let grant = authority.issue("owner-1").await.unwrap();

    assert!(grant.transfer_code.starts_with("088SH"));
    assert_eq!(grant.masked_user_name, "K*********u");
    assert_eq!(grant.issuer_code, "088");
    // Expiry is ISO-8601 and ~10 minutes out.
    let expires = chrono::DateTime::parse_from_rfc3339(&grant.expires_at).unwrap();
    let minutes = (expires.with_timezone(&Utc) - Utc::now()).num_minutes();
    assert!((9..=10).contains(&minutes));
}

#[tokio::test]
async fn issue_for_unknown_owner_fails() {
    let (authority, _, _) = seeded_authority().await;
    assert!(authority.issue("nobody").await.is_err());
}

#[tokio::test]
async fn reissuing_leaves_exactly_one_active_code() {
    let (authority, _, _) = seeded_authority().await;

    let first = authority.issue("owner-1").await.unwrap();
    let second = authority.issue("owner-1").await.unwrap();

    assert_eq!(authority.active_code_count("owner-1").await.unwrap(), 1);

    // The first code is revoked with no grace period.
    let old = authority.validate(&first.transfer_code).await.unwrap();
    assert!(!old.is_valid);
    let current = authority.validate(&second.transfer_code).await.unwrap();
    assert!(current.is_valid);
}

#[tokio::test]
async fn concurrent_issuance_preserves_the_single_active_invariant() {
    let (authority, _, _) = seeded_authority().await;

    let a = authority.clone();
    let b = authority.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.issue("owner-1").await }),
        tokio::spawn(async move { b.issue("owner-1").await }),
    );
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    assert_eq!(authority.active_code_count("owner-1").await.unwrap(), 1);
}

#[tokio::test]
async fn validate_reports_the_issuer_and_masked_name() {
    let (authority, _, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    let validation = authority.validate(&grant.transfer_code).await.unwrap();

    assert!(validation.is_valid);
    assert_eq!(validation.masked_user_name.as_deref(), Some("K*********u"));
    assert_eq!(validation.issuer_name.as_deref(), Some("Shinhan Bank"));
    assert!(validation.expires_at.is_some());
    assert!(validation.error_message.is_none());
}

#[tokio::test]
async fn validate_rejects_unknown_and_used_codes_with_the_same_message() {
    let (authority, _, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();
    authority.consume(&grant.transfer_code).await.unwrap();

    let unknown = authority.validate("088SHAAAAAA999").await.unwrap();
    let used = authority.validate(&grant.transfer_code).await.unwrap();

    assert!(!unknown.is_valid);
    assert!(!used.is_valid);
    // Identical text, so a scanner cannot probe which codes exist.
    assert_eq!(unknown.error_message, used.error_message);
}

#[tokio::test]
async fn validate_rejects_a_suspended_owner() {
    let (authority, _, directory) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    directory.set_active("owner-1", false).await;

    let validation = authority.validate(&grant.transfer_code).await.unwrap();
    assert!(!validation.is_valid);
    assert!(validation
        .error_message
        .as_deref()
        .unwrap()
        .contains("unavailable"));
}

#[tokio::test]
async fn validate_rejects_codes_that_fail_the_prefilter() {
    let (authority, _, _) = seeded_authority().await;

    let validation = authority.validate("not-a-code").await.unwrap();
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn consume_is_exactly_once_sequentially() {
    let (authority, _, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    assert!(authority.consume(&grant.transfer_code).await.unwrap());
    assert!(!authority.consume(&grant.transfer_code).await.unwrap());
}

#[tokio::test]
async fn concurrent_consume_has_exactly_one_winner() {
    let (authority, _, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    let a = authority.clone();
    let b = authority.clone();
    let code_a = grant.transfer_code.clone();
    let code_b = grant.transfer_code.clone();

    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.consume(&code_a).await.unwrap() }),
        tokio::spawn(async move { b.consume(&code_b).await.unwrap() }),
    );
    let wins = [ra.unwrap(), rb.unwrap()];

    assert_eq!(wins.iter().filter(|&&w| w).count(), 1);
}

#[tokio::test]
async fn redeem_succeeds_once_then_reports_failure() {
    let (authority, _, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    let first = authority.redeem(&grant.transfer_code).await.unwrap();
    assert_eq!(first.status, RedemptionStatus::Success);
    assert!(!first.code_id.is_empty());
    assert!(first.completed_at.is_some());

    let second = authority.redeem(&grant.transfer_code).await.unwrap();
    assert_eq!(second.status, RedemptionStatus::Failed);
    assert!(second.code_id.is_empty());
    assert!(second.completed_at.is_none());
}

#[tokio::test]
async fn revoke_requires_ownership() {
    let (authority, store, directory) = seeded_authority().await;
    directory
        .insert(OwnerProfile {
            owner_id: "owner-2".to_string(),
            display_name: "Hong Gildong".to_string(),
            secret: "CUST0002".to_string(),
            active: true,
        })
        .await;

    let grant = authority.issue("owner-1").await.unwrap();
    let record = {
        use authority::CodeStore;
        store
            .find_by_code(&grant.transfer_code)
            .await
            .unwrap()
            .unwrap()
    };

    assert!(authority.revoke(record.code_id, "owner-2").await.is_err());
    authority.revoke(record.code_id, "owner-1").await.unwrap();

    let validation = authority.validate(&grant.transfer_code).await.unwrap();
    assert!(!validation.is_valid);
}

#[tokio::test]
async fn active_grant_reflects_the_latest_issue() {
    let (authority, _, _) = seeded_authority().await;

    assert!(authority.active_grant("owner-1").await.unwrap().is_none());

    let issued = authority.issue("owner-1").await.unwrap();
    let active = authority.active_grant("owner-1").await.unwrap().unwrap();
    assert_eq!(active.transfer_code, issued.transfer_code);
}

#[tokio::test]
async fn cleanup_deactivates_expired_rows() {
    let (authority, store, _) = seeded_authority().await;
    let grant = authority.issue("owner-1").await.unwrap();

    // Force the row past its expiry, then sweep.
    {
        use authority::CodeStore;
        let mut record = store
            .find_by_code(&grant.transfer_code)
            .await
            .unwrap()
            .unwrap();
        record.expires_at = Utc::now() - Duration::minutes(1);
        store
            .revoke_then_insert("owner-1", record)
            .await
            .unwrap();
    }

    assert_eq!(authority.cleanup_expired().await.unwrap(), 1);
    assert_eq!(authority.active_code_count("owner-1").await.unwrap(), 0);
}

//! Card key lifecycle and VIP redemption
//!
//! ```bash
//! cargo test -p integration-tests --test card_keys
//! ```

use std::collections::HashSet;

use chrono::{Duration, Utc};
use integration_tests::TestHarness;
use ums_core::entities::{AuditAction, AuditStatus, CardStatus, CardType, VipLevel};
use ums_core::traits::CardKeyRepository;
use ums_core::value_objects::{CardKeyId, UserId};
use ums_core::{is_well_formed_card_code, ErrorKind};
use ums_service::{
    BatchDeleteCardKeysRequest, CardKeyService, CreateCardKeysRequest, ListCardKeysRequest,
};

fn request(count: u32, duration_days: i32) -> CreateCardKeysRequest {
    CreateCardKeysRequest {
        card_type: CardType::VipUpgrade,
        count,
        duration_days,
        remark: None,
        expire_at: None,
    }
}

fn assert_close(actual: chrono::DateTime<Utc>, expected: chrono::DateTime<Utc>) {
    let drift = (actual - expected).num_seconds().abs();
    assert!(drift <= 2, "expected ~{expected}, got {actual}");
}

// ============================================================================
// Generation
// ============================================================================

#[tokio::test]
async fn test_create_generates_distinct_unused_codes() {
    let harness = TestHarness::new();
    let service = CardKeyService::new(&harness.ctx);

    let keys = service
        .create(&harness.admin(), request(50, 30))
        .await
        .unwrap();

    assert_eq!(keys.len(), 50);
    let codes: HashSet<&str> = keys.iter().map(|k| k.code.as_str()).collect();
    assert_eq!(codes.len(), 50);
    assert!(keys.iter().all(|k| is_well_formed_card_code(&k.code)));
    assert!(keys.iter().all(|k| k.status == CardStatus::Unused));
    assert!(keys.iter().all(|k| k.duration_days == 30));
    assert!(keys.iter().all(|k| !k.id.is_unassigned()));
}

#[tokio::test]
async fn test_create_rejects_out_of_range_requests() {
    let harness = TestHarness::new();
    let service = CardKeyService::new(&harness.ctx);
    let admin = harness.admin();

    for bad in [request(0, 30), request(101, 30), request(1, 0), request(1, 366)] {
        let err = service.create(&admin, bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    let mut long_remark = request(1, 30);
    long_remark.remark = Some("x".repeat(201));
    let err = service.create(&admin, long_remark).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(harness.store.card_key_count(), 0);
}

// ============================================================================
// Redemption
// ============================================================================

#[tokio::test]
async fn test_redeem_grants_vip_from_now() {
    let harness = TestHarness::new();
    let user = harness.seed_user("fresh").await;
    let key = harness.seed_keys(1, 30).await.remove(0);

    let updated = CardKeyService::new(&harness.ctx)
        .redeem_vip_code(&key.code, user.id)
        .await
        .unwrap();

    assert_eq!(updated.vip_level, VipLevel::Vip);
    assert_close(updated.vip_expire_at.unwrap(), Utc::now() + Duration::days(30));

    let stored_key = harness.store.card_key(key.id).unwrap();
    assert_eq!(stored_key.status, CardStatus::Used);
    assert_eq!(stored_key.used_by, Some(user.id));
    assert!(stored_key.used_at.is_some());

    let stored_user = harness.store.user(user.id).unwrap();
    assert_eq!(stored_user.vip_expire_at, updated.vip_expire_at);
}

#[tokio::test]
async fn test_redeem_stacks_on_active_vip() {
    let harness = TestHarness::new();
    let current = Utc::now() + Duration::days(10);
    let user = harness.seed_vip("stack", None, current).await;
    let key = harness.seed_keys(1, 30).await.remove(0);

    let updated = CardKeyService::new(&harness.ctx)
        .redeem_vip_code(&key.code, user.id)
        .await
        .unwrap();

    assert_eq!(updated.vip_expire_at, Some(current + Duration::days(30)));
}

#[tokio::test]
async fn test_redeem_after_lapse_restarts_from_now() {
    let harness = TestHarness::new();
    let user = harness
        .seed_vip("lapsed", None, Utc::now() - Duration::days(5))
        .await;
    let key = harness.seed_keys(1, 30).await.remove(0);

    let updated = CardKeyService::new(&harness.ctx)
        .redeem_vip_code(&key.code, user.id)
        .await
        .unwrap();

    assert_close(updated.vip_expire_at.unwrap(), Utc::now() + Duration::days(30));
}

#[tokio::test]
async fn test_redeem_twice_fails_without_extending() {
    let harness = TestHarness::new();
    let user = harness.seed_user("twice").await;
    let key = harness.seed_keys(1, 30).await.remove(0);
    let service = CardKeyService::new(&harness.ctx);

    let first = service.redeem_vip_code(&key.code, user.id).await.unwrap();
    let err = service
        .redeem_vip_code(&key.code, user.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(
        harness.store.user(user.id).unwrap().vip_expire_at,
        first.vip_expire_at
    );
}

#[tokio::test]
async fn test_redeem_rejections_leave_state_untouched() {
    let harness = TestHarness::new();
    let user = harness.seed_user("reject").await;
    let service = CardKeyService::new(&harness.ctx);
    let admin = harness.admin();

    let disabled = harness.seed_keys(1, 30).await.remove(0);
    service.disable(&admin, disabled.id).await.unwrap();
    let err = service
        .redeem_vip_code(&disabled.code, user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let mut expiring = request(1, 30);
    expiring.expire_at = Some(Utc::now() - Duration::hours(1));
    let expired = service.create(&admin, expiring).await.unwrap().remove(0);
    let err = service
        .redeem_vip_code(&expired.code, user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Expired);

    let registration = harness
        .seed_keys_of(CardType::Registration, 1, 30)
        .await
        .remove(0);
    let err = service
        .redeem_vip_code(&registration.code, user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongType);

    let err = service
        .redeem_vip_code("TL|000000000000000000000000", user.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let unused = harness.seed_keys(1, 30).await.remove(0);
    let err = service
        .redeem_vip_code(&unused.code, UserId::new(987_654))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        harness.store.card_key(unused.id).unwrap().status,
        CardStatus::Unused
    );

    let user = harness.store.user(user.id).unwrap();
    assert_eq!(user.vip_level, VipLevel::Standard);
    assert!(user.vip_expire_at.is_none());
}

#[tokio::test]
async fn test_concurrent_redemption_has_single_winner() {
    let harness = TestHarness::new();
    let alice = harness.seed_user("alice").await;
    let bob = harness.seed_user("bob").await;
    let key = harness.seed_keys(1, 30).await.remove(0);

    let service_a = CardKeyService::new(&harness.ctx);
    let service_b = CardKeyService::new(&harness.ctx);
    let (a, b) = tokio::join!(
        service_a.redeem_vip_code(&key.code, alice.id),
        service_b.redeem_vip_code(&key.code, bob.id),
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    let winner = if a.is_ok() { alice.id } else { bob.id };
    let loser = if a.is_ok() { bob.id } else { alice.id };

    let stored = harness.store.card_key(key.id).unwrap();
    assert_eq!(stored.used_by, Some(winner));
    assert_eq!(
        harness.store.user(loser).unwrap().vip_level,
        VipLevel::Standard
    );
}

#[tokio::test]
async fn test_validate_code_accepts_either_type() {
    let harness = TestHarness::new();
    let service = CardKeyService::new(&harness.ctx);
    let registration = harness
        .seed_keys_of(CardType::Registration, 1, 30)
        .await
        .remove(0);

    let checked = service
        .validate_code(&format!("  {}  ", registration.code))
        .await
        .unwrap();
    assert_eq!(checked.id, registration.id);

    let err = service
        .validate_vip_code(&registration.code)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WrongType);

    let err = service.validate_code("   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_validate_vip_code_runs_every_redemption_check() {
    let harness = TestHarness::new();
    let service = CardKeyService::new(&harness.ctx);
    let keys = harness.seed_keys(2, 30).await;

    let checked = service.validate_vip_code(&keys[0].code).await.unwrap();
    assert_eq!(checked.id, keys[0].id);
    assert_eq!(harness.store.card_key(keys[0].id).unwrap().status, CardStatus::Unused);

    service.disable(&harness.admin(), keys[1].id).await.unwrap();
    let err = service.validate_vip_code(&keys[1].code).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_disable_enable_are_idempotent_until_used() {
    let harness = TestHarness::new();
    let user = harness.seed_user("admin-ops").await;
    let key = harness.seed_keys(1, 30).await.remove(0);
    let service = CardKeyService::new(&harness.ctx);
    let admin = harness.admin();

    service.disable(&admin, key.id).await.unwrap();
    service.disable(&admin, key.id).await.unwrap();
    assert_eq!(
        harness.store.card_key(key.id).unwrap().status,
        CardStatus::Disabled
    );

    service.enable(&admin, key.id).await.unwrap();
    service.enable(&admin, key.id).await.unwrap();
    assert_eq!(
        harness.store.card_key(key.id).unwrap().status,
        CardStatus::Unused
    );

    service.redeem_vip_code(&key.code, user.id).await.unwrap();
    for err in [
        service.disable(&admin, key.id).await.unwrap_err(),
        service.enable(&admin, key.id).await.unwrap_err(),
        service.delete(&admin, key.id).await.unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
    assert_eq!(
        harness.store.card_key(key.id).unwrap().status,
        CardStatus::Used
    );

    let err = service
        .disable(&admin, CardKeyId::new(424_242))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_and_batch_delete_skip_used_keys() {
    let harness = TestHarness::new();
    let user = harness.seed_user("batch").await;
    let keys = harness.seed_keys(4, 30).await;
    let service = CardKeyService::new(&harness.ctx);
    let admin = harness.admin();

    service.delete(&admin, keys[0].id).await.unwrap();
    let err = service.get(keys[0].id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    service
        .redeem_vip_code(&keys[1].code, user.id)
        .await
        .unwrap();

    let deleted = service
        .batch_delete(
            &admin,
            BatchDeleteCardKeysRequest {
                ids: vec![keys[1].id, keys[2].id, keys[3].id, CardKeyId::new(424_242)],
            },
        )
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    assert!(harness.store.card_key(keys[1].id).is_some());
    assert_eq!(harness.store.card_key_count(), 1);

    let err = service
        .batch_delete(&admin, BatchDeleteCardKeysRequest { ids: Vec::new() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_list_filters_and_statistics() {
    let harness = TestHarness::new();
    let user = harness.seed_user("stats").await;
    let service = CardKeyService::new(&harness.ctx);
    let admin = harness.admin();

    let mut tagged = request(3, 7);
    tagged.remark = Some("spring-promo".to_string());
    let promo = service.create(&admin, tagged).await.unwrap();
    let plain = harness.seed_keys(5, 30).await;

    service.disable(&admin, plain[0].id).await.unwrap();
    service
        .redeem_vip_code(&plain[1].code, user.id)
        .await
        .unwrap();

    let stats = service.statistics().await.unwrap();
    assert_eq!(stats.total, 8);
    assert_eq!(stats.unused, 6);
    assert_eq!(stats.used, 1);
    assert_eq!(stats.disabled, 1);

    let page = service
        .list(&ListCardKeysRequest {
            keyword: Some("spring".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let ids: HashSet<CardKeyId> = page.items.iter().map(|k| k.id).collect();
    assert!(promo.iter().all(|k| ids.contains(&k.id)));

    let page = service
        .list(&ListCardKeysRequest {
            status: Some(CardStatus::Unused),
            page: 2,
            page_size: 4,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.items.len(), 2);

    let err = service
        .list(&ListCardKeysRequest {
            page_size: 0,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_duplicate_code_rejects_whole_batch() {
    let harness = TestHarness::new();
    let existing = harness.seed_keys(1, 30).await.remove(0);

    let mut clash = existing.clone();
    clash.id = CardKeyId::default();
    let err = harness
        .store
        .create_batch(&[clash])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(harness.store.card_key_count(), 1);
}

// ============================================================================
// Audit trail
// ============================================================================

#[tokio::test]
async fn test_operations_are_audited() {
    let mut harness = TestHarness::new();
    let user = harness.seed_user("audited").await;
    let keys = harness.seed_keys(2, 30).await;
    let service = CardKeyService::new(&harness.ctx);

    service
        .redeem_vip_code(&keys[0].code, user.id)
        .await
        .unwrap();
    service
        .redeem_vip_code(&keys[0].code, user.id)
        .await
        .unwrap_err();
    service.disable(&harness.admin(), keys[1].id).await.unwrap();

    let entries = harness.audit_entries().await;
    let actions: Vec<(AuditAction, AuditStatus)> =
        entries.iter().map(|e| (e.action, e.status)).collect();

    assert!(actions.contains(&(AuditAction::CardKeysCreated, AuditStatus::Success)));
    assert!(actions.contains(&(AuditAction::CardKeyRedeemed, AuditStatus::Success)));
    assert!(actions.contains(&(AuditAction::CardKeyDisabled, AuditStatus::Success)));

    let redeemed = entries
        .iter()
        .find(|e| e.action == AuditAction::CardKeyRedeemed)
        .unwrap();
    assert_eq!(redeemed.user_id, Some(user.id));
    assert_eq!(redeemed.target_id.as_deref(), Some(keys[0].id.to_string().as_str()));
}

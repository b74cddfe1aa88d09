//! The worker's periodic tasks driven by the scheduler (paused clock)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use integration_tests::{HarnessOptions, StaticDirectory, TestHarness};
use ums_common::SchedulerConfig;
use ums_core::entities::{MediaUser, VipLevel};
use ums_core::traits::UserRepository;
use ums_service::{CleanupTask, Scheduler, UserSyncTask, VipExpiryTask};

fn config() -> SchedulerConfig {
    SchedulerConfig {
        sync_interval: Duration::from_secs(600),
        vip_interval: Duration::from_secs(3600),
        cleanup_interval: Duration::from_secs(86_400),
        cleanup_initial_delay: Duration::from_secs(300),
    }
}

/// Let spawned loops run until they are idle
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_vip_task_runs_on_start_and_each_interval() {
    let harness = TestHarness::new();
    let lapsed = harness
        .seed_vip("lapsed", None, Utc::now() - chrono::Duration::days(1))
        .await;

    let mut scheduler = Scheduler::new();
    scheduler.add(VipExpiryTask::new(harness.ctx.clone(), &config()));
    scheduler.start();
    settle().await;

    assert_eq!(harness.store.user(lapsed.id).unwrap().vip_level, VipLevel::Standard);

    // A VIP that lapses between runs is picked up on the next tick
    let mut later = harness
        .seed_vip("later", None, Utc::now() + chrono::Duration::days(1))
        .await;
    later.vip_expire_at = Some(Utc::now() - chrono::Duration::minutes(1));
    harness.store.put_user(later.clone());

    tokio::time::sleep(config().vip_interval / 2).await;
    assert_eq!(harness.store.user(later.id).unwrap().vip_level, VipLevel::Vip);

    tokio::time::sleep(config().vip_interval / 2).await;
    settle().await;
    assert_eq!(harness.store.user(later.id).unwrap().vip_level, VipLevel::Standard);

    scheduler.stop();
    assert!(!scheduler.is_running());
    scheduler.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_vip_cycle_keeps_task_scheduled() {
    let harness = TestHarness::new();
    let lapsed = harness
        .seed_vip("lapsed", None, Utc::now() - chrono::Duration::days(1))
        .await;
    harness.store.set_fail_demotion(true);

    let mut scheduler = Scheduler::new();
    scheduler.add(VipExpiryTask::new(harness.ctx.clone(), &config()));
    scheduler.start();
    settle().await;

    assert_eq!(harness.store.user(lapsed.id).unwrap().vip_level, VipLevel::Vip);
    assert!(scheduler.is_running());

    harness.store.set_fail_demotion(false);
    tokio::time::sleep(config().vip_interval).await;
    settle().await;
    assert_eq!(harness.store.user(lapsed.id).unwrap().vip_level, VipLevel::Standard);

    scheduler.stop();
    scheduler.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_task_waits_for_initial_delay() {
    let harness = TestHarness::new();
    harness
        .store
        .add_access_record(Utc::now() - chrono::Duration::days(365));

    let mut scheduler = Scheduler::new();
    scheduler.add(CleanupTask::new(harness.ctx.clone(), &config()));
    scheduler.start();

    tokio::time::sleep(Duration::from_secs(299)).await;
    settle().await;
    assert_eq!(harness.store.access_record_count(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert_eq!(harness.store.access_record_count(), 0);

    scheduler.stop();
    scheduler.join().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_delay_skips_the_run() {
    let harness = TestHarness::new();
    harness
        .store
        .add_access_record(Utc::now() - chrono::Duration::days(365));

    let mut scheduler = Scheduler::new();
    scheduler.add(CleanupTask::new(harness.ctx.clone(), &config()));
    scheduler.start();
    settle().await;

    scheduler.stop();
    scheduler.join().await;

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(harness.store.access_record_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sync_task_imports_users() {
    let harness = TestHarness::with_options(HarnessOptions {
        directory: Some(Arc::new(StaticDirectory::new(vec![MediaUser {
            id: "m-zoe".to_string(),
            name: "zoe".to_string(),
        }]))),
        ..Default::default()
    });

    let mut scheduler = Scheduler::new();
    scheduler.add(UserSyncTask::new(harness.ctx.clone(), &config()));
    scheduler.start();
    settle().await;

    let zoe = harness.store.find_by_username("zoe").await.unwrap();
    assert!(zoe.is_some());

    scheduler.stop();
    scheduler.join().await;
}

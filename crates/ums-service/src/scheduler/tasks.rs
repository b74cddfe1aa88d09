//! The periodic jobs run by the worker.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use ums_common::SchedulerConfig;

use super::PeriodicTask;
use crate::services::{CleanupService, ServiceContext, UserSyncService, VipExpiryService};

/// Hourly VIP demotion and expiry warnings
pub struct VipExpiryTask {
    ctx: ServiceContext,
    interval: Duration,
}

impl VipExpiryTask {
    pub fn new(ctx: ServiceContext, config: &SchedulerConfig) -> Self {
        Self {
            ctx,
            interval: config.vip_interval,
        }
    }
}

#[async_trait]
impl PeriodicTask for VipExpiryTask {
    fn name(&self) -> &'static str {
        "vip_expiry"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) {
        if let Err(e) = VipExpiryService::new(&self.ctx).run_cycle().await {
            warn!(error = %e, "VIP expiry cycle failed");
        }
    }
}

/// Media server account import
pub struct UserSyncTask {
    ctx: ServiceContext,
    interval: Duration,
}

impl UserSyncTask {
    pub fn new(ctx: ServiceContext, config: &SchedulerConfig) -> Self {
        Self {
            ctx,
            interval: config.sync_interval,
        }
    }
}

#[async_trait]
impl PeriodicTask for UserSyncTask {
    fn name(&self) -> &'static str {
        "user_sync"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) {
        if let Err(e) = UserSyncService::new(&self.ctx).run().await {
            warn!(error = %e, "Media server user sync failed");
        }
    }
}

/// Retention cleanup, delayed after startup
pub struct CleanupTask {
    ctx: ServiceContext,
    interval: Duration,
    initial_delay: Duration,
}

impl CleanupTask {
    pub fn new(ctx: ServiceContext, config: &SchedulerConfig) -> Self {
        Self {
            ctx,
            interval: config.cleanup_interval,
            initial_delay: config.cleanup_initial_delay,
        }
    }
}

#[async_trait]
impl PeriodicTask for CleanupTask {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    async fn run(&self) {
        if let Err(e) = CleanupService::new(&self.ctx).run().await {
            warn!(error = %e, "Data cleanup failed");
        }
    }
}

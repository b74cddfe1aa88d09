//! Startup, job registration and shutdown

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ums_cache::{RedisLoginAttemptStore, RedisPool, RedisPoolConfig};
use ums_common::{AppConfig, AppError};
use ums_core::traits::{MediaUserDirectory, Notifier};
use ums_db::{
    apply_schema, create_pool, DatabaseConfig, PgAccessRecordRepository, PgAuditLogRepository,
    PgCardKeyRepository, PgUserRepository,
};
use ums_integrations::{EmbyClient, LogNotifier, ResendNotifier};
use ums_service::{
    AuditRecorder, CleanupTask, QueuedNotifier, Scheduler, ServiceContext, UserSyncTask,
    VipExpiryTask,
};

/// Upper bound on waiting for jobs and queues to wind down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Everything started for one process lifetime
pub struct Runtime {
    pub ctx: ServiceContext,
    pub scheduler: Scheduler,
    cancel: CancellationToken,
    queue_handles: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Stop the scheduler and queues, waiting up to the grace period
    pub async fn shutdown(self) {
        self.scheduler.stop();
        self.cancel.cancel();

        let drain = async move {
            self.scheduler.join().await;
            for handle in self.queue_handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Queue worker panicked");
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutdown grace period elapsed");
        }
    }
}

/// Connect stores and assemble the service context
///
/// Returns the context plus the handles of the queue workers it owns.
pub async fn create_service_context(
    config: &AppConfig,
    cancel: &CancellationToken,
) -> Result<(ServiceContext, Vec<JoinHandle<()>>), AppError> {
    info!("Connecting to PostgreSQL...");
    let db_config = DatabaseConfig::from_app_config(&config.database, config.timeouts.store);
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    apply_schema(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    info!("Connecting to Redis...");
    let redis_pool = RedisPool::new(RedisPoolConfig::from_app_config(
        &config.redis,
        config.timeouts.store,
    ))
    .map_err(|e| AppError::Cache(e.to_string()))?;
    redis_pool
        .health_check()
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    info!("Redis connection established");

    let delivery: Arc<dyn Notifier> =
        match ResendNotifier::from_config(&config.email, config.timeouts.notify) {
            Some(resend) => Arc::new(
                resend
                    .context("building Resend client")
                    .map_err(AppError::Internal)?,
            ),
            None => Arc::new(LogNotifier::new()),
        };
    let (notifier, notify_handle) = QueuedNotifier::spawn(
        delivery,
        config.timeouts.notify,
        config.queue,
        cancel.child_token(),
    );

    let audit_repo = Arc::new(PgAuditLogRepository::new(pool.clone()));
    let (audit, audit_handle) = AuditRecorder::spawn(
        audit_repo.clone(),
        config.timeouts.store,
        config.queue,
        cancel.child_token(),
    );

    let mut builder = ServiceContext::builder()
        .card_key_repo(Arc::new(PgCardKeyRepository::new(pool.clone())))
        .user_repo(Arc::new(PgUserRepository::new(pool.clone())))
        .audit_log_repo(audit_repo)
        .access_record_repo(Arc::new(PgAccessRecordRepository::new(pool)))
        .login_attempts(Arc::new(RedisLoginAttemptStore::new(redis_pool)))
        .notifier(Arc::new(notifier))
        .audit(audit)
        .login_guard(config.login_guard)
        .vip(config.vip)
        .timeouts(config.timeouts)
        .retention(config.retention);

    if let Some(media) = &config.media_server {
        let client = EmbyClient::from_config(media, config.timeouts.notify)
            .context("building media server client")
            .map_err(AppError::Internal)?;
        let directory: Arc<dyn MediaUserDirectory> = Arc::new(client);
        builder = builder.media_directory(directory);
    }

    let ctx = builder.build()?;
    Ok((ctx, vec![notify_handle, audit_handle]))
}

/// Register the periodic jobs for this configuration
pub fn create_scheduler(
    config: &AppConfig,
    ctx: &ServiceContext,
    cancel: &CancellationToken,
) -> Scheduler {
    let mut scheduler = Scheduler::with_cancel(cancel.child_token());
    scheduler.add(VipExpiryTask::new(ctx.clone(), &config.scheduler));
    scheduler.add(CleanupTask::new(ctx.clone(), &config.scheduler));
    if ctx.media_directory().is_some() {
        scheduler.add(UserSyncTask::new(ctx.clone(), &config.scheduler));
    } else {
        info!("Media server not configured, user sync disabled");
    }
    scheduler
}

/// Build everything and start the scheduler
pub async fn start(config: &AppConfig) -> Result<Runtime, AppError> {
    let cancel = CancellationToken::new();
    let (ctx, queue_handles) = create_service_context(config, &cancel).await?;
    let mut scheduler = create_scheduler(config, &ctx, &cancel);
    scheduler.start();

    Ok(Runtime {
        ctx,
        scheduler,
        cancel,
        queue_handles,
    })
}

/// Run until Ctrl+C, then shut down
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let runtime = start(&config).await?;
    info!("Worker running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")
        .map_err(AppError::Internal)?;

    info!("Shutdown signal received");
    runtime.shutdown().await;
    info!("Worker stopped");
    Ok(())
}

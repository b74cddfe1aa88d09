//! Data retention cleanup

use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};

use crate::dto::CleanupReport;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Cleanup service
pub struct CleanupService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CleanupService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Purge with the configured retention windows
    pub async fn run(&self) -> ServiceResult<CleanupReport> {
        let retention = *self.ctx.retention();
        self.run_with(retention.access_record_days, retention.audit_log_days)
            .await
    }

    /// Purge access records and audit logs older than the given ages
    ///
    /// The two purges are independent: a failure in one is logged and the
    /// other still runs.
    #[instrument(skip(self))]
    pub async fn run_with(
        &self,
        access_record_days: i64,
        audit_log_days: i64,
    ) -> ServiceResult<CleanupReport> {
        let started = Instant::now();
        let now = Utc::now();

        let access_records = match self
            .ctx
            .store(
                "access record purge",
                self.ctx
                    .access_record_repo()
                    .purge_before(now - Duration::days(access_record_days)),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Access record purge failed");
                0
            }
        };

        let audit_logs = match self
            .ctx
            .store(
                "audit log purge",
                self.ctx
                    .audit_log_repo()
                    .purge_before(now - Duration::days(audit_log_days)),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Audit log purge failed");
                0
            }
        };

        let report = CleanupReport {
            access_records,
            audit_logs,
            elapsed: started.elapsed(),
        };
        info!(
            access_records,
            audit_logs,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Data cleanup completed"
        );
        Ok(report)
    }
}

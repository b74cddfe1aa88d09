//! VIP expiry processing
//!
//! One cycle demotes every lapsed VIP with a single conditional update, then
//! warns VIPs whose expiry falls inside the warning window. The cursor API
//! pages through lapsed VIPs for callers that need per-user follow-up.

use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use ums_core::entities::{ExpiryWarning, User};
use ums_core::traits::{PageRequest, RepoResult};
use ums_core::value_objects::UserId;

use crate::dto::{ExpiredBatchSummary, VipExpiryReport, VipStatistics};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Expiry timestamps in warnings, always UTC
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// VIP expiry service
pub struct VipExpiryService<'a> {
    ctx: &'a ServiceContext,
}

#[derive(Default)]
struct WarningTally {
    sent: u64,
    failed: u64,
    skipped_without_contact: u64,
}

impl<'a> VipExpiryService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Run one full cycle: demotion, expiring-soon count, warning pass
    ///
    /// Only a demotion failure aborts the cycle; the next run retries it.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> ServiceResult<VipExpiryReport> {
        let started = Instant::now();
        let now = Utc::now();
        let window_end = now + Duration::days(self.ctx.vip_config().warning_days);

        let demoted = match self
            .ctx
            .store("bulk VIP demotion", self.ctx.user_repo().bulk_demote_expired(now))
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "VIP demotion failed, cycle aborted");
                return Err(e.into());
            }
        };

        let expiring_soon = match self
            .ctx
            .store(
                "expiring VIP count",
                self.ctx.user_repo().count_expiring_between(now, window_end),
            )
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Counting expiring VIPs failed");
                0
            }
        };

        let tally = self.send_warnings(now, window_end).await;

        let report = VipExpiryReport {
            demoted,
            expiring_soon,
            warnings_sent: tally.sent,
            warnings_failed: tally.failed,
            skipped_without_contact: tally.skipped_without_contact,
            elapsed: started.elapsed(),
        };

        info!(
            demoted = report.demoted,
            expiring_soon = report.expiring_soon,
            warnings_sent = report.warnings_sent,
            warnings_failed = report.warnings_failed,
            skipped_without_contact = report.skipped_without_contact,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "VIP expiry cycle completed"
        );

        Ok(report)
    }

    /// One warning per VIP expiring in `(now, window_end]`
    async fn send_warnings(&self, now: DateTime<Utc>, window_end: DateTime<Utc>) -> WarningTally {
        let config = self.ctx.vip_config();
        let mut tally = WarningTally::default();
        let mut seen: HashSet<UserId> = HashSet::new();
        let mut page = PageRequest::new(config.batch_size, 0);

        for _ in 0..config.max_batches {
            let users = match self
                .ctx
                .store(
                    "expiring VIP listing",
                    self.ctx.user_repo().list_expiring_between(now, window_end, page),
                )
                .await
            {
                Ok(users) => users,
                Err(e) => {
                    warn!(error = %e, offset = page.offset, "Listing expiring VIPs failed");
                    break;
                }
            };
            let fetched = users.len();

            for user in users {
                if !seen.insert(user.id) {
                    continue;
                }
                let Some(warning) = expiry_warning(&user, now) else {
                    tally.skipped_without_contact += 1;
                    continue;
                };
                match self
                    .ctx
                    .external(
                        "expiry warning dispatch",
                        self.ctx.notifier().send_expiry_warning(&warning),
                    )
                    .await
                {
                    Ok(()) => tally.sent += 1,
                    Err(e) => {
                        tally.failed += 1;
                        warn!(user_id = %user.id, error = %e, "Expiry warning not sent");
                    }
                }
            }

            if (fetched as i64) < page.limit {
                break;
            }
            page = page.next();
        }

        tally
    }

    /// Page through IDs of lapsed VIPs, handing each page to `callback`
    ///
    /// Callback failures are logged and do not stop the iteration. At most
    /// `max_batches` pages of `batch_size` are visited.
    #[instrument(skip(self, callback))]
    pub async fn process_expired_batches<F, Fut>(
        &self,
        mut callback: F,
    ) -> ServiceResult<ExpiredBatchSummary>
    where
        F: FnMut(Vec<UserId>) -> Fut,
        Fut: Future<Output = RepoResult<()>>,
    {
        let config = self.ctx.vip_config();
        let now = Utc::now();
        let mut summary = ExpiredBatchSummary::default();
        let mut page = PageRequest::new(config.batch_size, 0);

        while summary.batches < config.max_batches {
            let ids = self
                .ctx
                .store(
                    "expired VIP listing",
                    self.ctx.user_repo().list_expired_ids(now, page),
                )
                .await?;
            if ids.is_empty() {
                break;
            }

            let count = ids.len();
            summary.batches += 1;
            summary.users += count as u64;

            if let Err(e) = callback(ids).await {
                summary.failed_batches += 1;
                warn!(batch = summary.batches, error = %e, "Expired VIP batch callback failed");
            }

            if (count as i64) < page.limit {
                break;
            }
            page = page.next();
        }

        if summary.batches == config.max_batches {
            debug!(max_batches = config.max_batches, "Expired VIP paging hit batch limit");
        }

        Ok(summary)
    }

    /// VIP counts by expiry horizon
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> ServiceResult<VipStatistics> {
        let now = Utc::now();
        let repo = self.ctx.user_repo();

        let total_vip = self
            .ctx
            .store("active VIP count", repo.count_active_vip(now))
            .await?;
        let expiring_today = self
            .ctx
            .store("expiring VIP count", repo.count_expiring_between(now, end_of_day(now)))
            .await?;
        let expiring_3_days = self
            .ctx
            .store(
                "expiring VIP count",
                repo.count_expiring_between(now, now + Duration::days(3)),
            )
            .await?;
        let expiring_7_days = self
            .ctx
            .store(
                "expiring VIP count",
                repo.count_expiring_between(now, now + Duration::days(7)),
            )
            .await?;

        Ok(VipStatistics {
            total_vip,
            expiring_today,
            expiring_3_days,
            expiring_7_days,
        })
    }
}

/// Warning for `user`, or `None` when there is no address or no future expiry
pub fn expiry_warning(user: &User, now: DateTime<Utc>) -> Option<ExpiryWarning> {
    let address = user.contact_email()?;
    let expire_at = user.vip_expire_at?;
    let days_left = user.days_until_vip_expiry(now)?;
    Some(ExpiryWarning {
        address: address.to_string(),
        username: user.username.clone(),
        expires_at: expire_at.format(EXPIRY_FORMAT).to_string(),
        days_left,
    })
}

/// Last second of the UTC day containing `now`
fn end_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    now.date_naive().and_time(last_second).and_utc()
}

//! Response DTOs and job reports

use std::time::Duration;

use serde::Serialize;
use ums_core::traits::CardKeyCounts;

/// One page of a listing plus the total number of matches
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: i64,
    pub items: Vec<T>,
}

/// Card key counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CardKeyStatistics {
    pub total: i64,
    pub unused: i64,
    pub used: i64,
    pub disabled: i64,
}

impl From<CardKeyCounts> for CardKeyStatistics {
    fn from(counts: CardKeyCounts) -> Self {
        Self {
            total: counts.total(),
            unused: counts.unused,
            used: counts.used,
            disabled: counts.disabled,
        }
    }
}

/// VIP counts by expiry horizon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VipStatistics {
    /// VIPs whose expiry is still in the future
    pub total_vip: i64,
    /// Expiring before the end of the current UTC day
    pub expiring_today: i64,
    pub expiring_3_days: i64,
    pub expiring_7_days: i64,
}

/// Outcome of one VIP expiry cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VipExpiryReport {
    pub demoted: u64,
    pub expiring_soon: i64,
    pub warnings_sent: u64,
    pub warnings_failed: u64,
    pub skipped_without_contact: u64,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

/// Outcome of paging through expired VIPs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpiredBatchSummary {
    pub batches: u32,
    pub users: u64,
    pub failed_batches: u32,
}

/// Outcome of one media server sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserSyncReport {
    pub fetched: usize,
    pub created: u64,
    pub linked: u64,
    pub failed: u64,
}

impl UserSyncReport {
    /// Accounts created or linked
    pub const fn synced(&self) -> u64 {
        self.created + self.linked
    }
}

/// Outcome of one retention cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub access_records: u64,
    pub audit_logs: u64,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl CleanupReport {
    pub const fn total(&self) -> u64 {
        self.access_records + self.audit_logs
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

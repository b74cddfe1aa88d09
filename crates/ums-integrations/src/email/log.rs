use async_trait::async_trait;
use tracing::info;
use ums_core::entities::ExpiryWarning;
use ums_core::traits::{Notifier, RepoResult};

/// Notifier that only writes the warning to the log.
///
/// Used in development and whenever no email provider is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_expiry_warning(&self, warning: &ExpiryWarning) -> RepoResult<()> {
        info!(
            to = %warning.address,
            username = %warning.username,
            expires_at = %warning.expires_at,
            days_left = warning.days_left,
            subject = %super::expiry_subject(warning),
            "VIP expiry warning (log only)"
        );
        Ok(())
    }
}

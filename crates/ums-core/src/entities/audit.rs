//! Audit entry - a record of an administrative or security-relevant event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    AccountLocked,
    CardKeysCreated,
    CardKeyRedeemed,
    CardKeyDisabled,
    CardKeyEnabled,
    CardKeyDeleted,
    UserSynced,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::LoginFailed => "login_failed",
            Self::AccountLocked => "account_locked",
            Self::CardKeysCreated => "card_keys_created",
            Self::CardKeyRedeemed => "card_key_redeemed",
            Self::CardKeyDisabled => "card_key_disabled",
            Self::CardKeyEnabled => "card_key_enabled",
            Self::CardKeyDeleted => "card_key_deleted",
            Self::UserSynced => "user_synced",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user_id: Option<UserId>,
    pub username: String,
    pub action: AuditAction,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub detail: serde_json::Value,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Start an entry for `username` performing `action`
    pub fn new(username: impl Into<String>, action: AuditAction, status: AuditStatus) -> Self {
        Self {
            user_id: None,
            username: username.into(),
            action,
            target_type: None,
            target_id: None,
            detail: serde_json::Value::Null,
            status,
            created_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_target(mut self, target_type: &str, target_id: impl ToString) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id.to_string());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

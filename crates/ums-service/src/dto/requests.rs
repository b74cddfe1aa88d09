//! Request DTOs for service operations

use chrono::{DateTime, Utc};
use serde::Deserialize;
use ums_core::entities::{CardStatus, CardType};
use ums_core::traits::{CardKeyFilter, PageRequest};
use ums_core::value_objects::{CardKeyId, UserId};
use validator::Validate;

/// Who is performing an administrative action (for the audit trail)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
}

impl Actor {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

// ============================================================================
// Card Key Requests
// ============================================================================

fn default_card_type() -> CardType {
    CardType::VipUpgrade
}

/// Generate a batch of card keys
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCardKeysRequest {
    #[serde(default = "default_card_type")]
    pub card_type: CardType,

    #[validate(range(min = 1, max = 100, message = "Count must be between 1 and 100"))]
    pub count: u32,

    #[validate(range(min = 1, max = 365, message = "Duration must be between 1 and 365 days"))]
    pub duration_days: i32,

    #[validate(length(max = 200, message = "Remark must be at most 200 characters"))]
    #[serde(default)]
    pub remark: Option<String>,

    /// Last moment the generated codes can be redeemed
    #[serde(default)]
    pub expire_at: Option<DateTime<Utc>>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

/// Filtered, paginated card key listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListCardKeysRequest {
    #[serde(default)]
    pub status: Option<CardStatus>,

    #[serde(default)]
    pub card_type: Option<CardType>,

    #[validate(length(max = 64, message = "Keyword must be at most 64 characters"))]
    #[serde(default)]
    pub keyword: Option<String>,

    #[validate(range(min = 1, message = "Page must be at least 1"))]
    #[serde(default = "default_page")]
    pub page: i64,

    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for ListCardKeysRequest {
    fn default() -> Self {
        Self {
            status: None,
            card_type: None,
            keyword: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ListCardKeysRequest {
    /// Repository filter; blank keywords are dropped
    pub fn to_filter(&self) -> CardKeyFilter {
        CardKeyFilter {
            status: self.status,
            card_type: self.card_type,
            keyword: self
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            page: PageRequest::from_page(self.page, self.page_size),
        }
    }
}

/// Delete several card keys at once
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchDeleteCardKeysRequest {
    #[validate(length(min = 1, max = 100, message = "Select between 1 and 100 card keys"))]
    pub ids: Vec<CardKeyId>,
}

//! Card key entity - a prepaid, single-use redemption code

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{CardKeyId, UserId};

/// Human-readable prefix distinguishing card codes from other identifiers
pub const CARD_CODE_PREFIX: &str = "TL|";

/// Random bytes per code (96 bits of entropy)
const CARD_CODE_ENTROPY_BYTES: usize = 12;

/// Total length of a rendered code: prefix + two hex chars per byte
const CARD_CODE_LEN: usize = CARD_CODE_PREFIX.len() + CARD_CODE_ENTROPY_BYTES * 2;

/// Card key type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Grants the right to register an account
    Registration,
    /// Grants (or extends) VIP membership
    VipUpgrade,
}

impl CardType {
    /// Stored column value
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Registration => 1,
            Self::VipUpgrade => 2,
        }
    }

    /// Parse the stored column value
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Registration),
            2 => Some(Self::VipUpgrade),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::VipUpgrade => "vip_upgrade",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card key status
///
/// `Disabled` and `Unused` may be toggled freely; `Used` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Disabled,
    Unused,
    Used,
}

impl CardStatus {
    /// Stored column value
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Disabled => 0,
            Self::Unused => 1,
            Self::Used => 2,
        }
    }

    /// Parse the stored column value
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Unused),
            2 => Some(Self::Used),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Unused => "unused",
            Self::Used => "used",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card key entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardKey {
    pub id: CardKeyId,
    pub code: String,
    pub card_type: CardType,
    pub duration_days: i32,
    pub status: CardStatus,
    pub used_by: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub remark: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl CardKey {
    /// Create a new unused card key with a freshly generated code
    pub fn new(
        card_type: CardType,
        duration_days: i32,
        remark: String,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CardKeyId::default(),
            code: generate_card_code(),
            card_type,
            duration_days,
            status: CardStatus::Unused,
            used_by: None,
            used_at: None,
            expire_at: None,
            remark,
            created_by,
            created_at,
        }
    }

    /// Set a deadline after which the code can no longer be redeemed
    pub fn with_expire_at(mut self, expire_at: DateTime<Utc>) -> Self {
        self.expire_at = Some(expire_at);
        self
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        self.status == CardStatus::Used
    }

    /// Check if the code is past its redemption deadline
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|expire_at| now > expire_at)
    }

    /// Check that the code could be redeemed right now (status and deadline)
    ///
    /// Type is not checked here: registration checks accept either type.
    pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self.status {
            CardStatus::Disabled => return Err(DomainError::CardKeyDisabled),
            CardStatus::Used => return Err(DomainError::CardKeyAlreadyUsed),
            CardStatus::Unused => {}
        }

        if self.is_expired_at(now) {
            return Err(DomainError::CardKeyExpired);
        }

        Ok(())
    }

    /// Check the code is of the expected type
    pub fn ensure_type(&self, expected: CardType) -> Result<(), DomainError> {
        if self.card_type == expected {
            Ok(())
        } else {
            Err(DomainError::WrongCardType {
                expected,
                actual: self.card_type,
            })
        }
    }

    /// Reject administrative changes to a used key
    pub fn ensure_modifiable(&self, action: &'static str) -> Result<(), DomainError> {
        if self.is_used() {
            Err(DomainError::CardKeyImmutable(action))
        } else {
            Ok(())
        }
    }

    /// Record redemption; only valid from `Unused`
    pub fn mark_used(&mut self, user_id: UserId, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != CardStatus::Unused {
            return Err(DomainError::RedemptionConflict);
        }
        self.status = CardStatus::Used;
        self.used_by = Some(user_id);
        self.used_at = Some(at);
        Ok(())
    }
}

/// Generate a card code from the operating system CSPRNG
///
/// Format: `TL|` followed by 24 uppercase hex characters.
pub fn generate_card_code() -> String {
    let mut bytes = [0u8; CARD_CODE_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{CARD_CODE_PREFIX}{}", hex::encode_upper(bytes))
}

/// Check that a string has the shape of a generated card code
pub fn is_well_formed_card_code(code: &str) -> bool {
    code.len() == CARD_CODE_LEN
        && code.starts_with(CARD_CODE_PREFIX)
        && code[CARD_CODE_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

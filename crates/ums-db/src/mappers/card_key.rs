//! Card key model -> entity mapper

use ums_core::entities::{CardKey, CardStatus, CardType};
use ums_core::error::DomainError;
use ums_core::value_objects::{CardKeyId, UserId};

use crate::models::CardKeyModel;

/// Convert CardKeyModel to CardKey entity
///
/// Fails on status or type codes the domain does not know.
impl TryFrom<CardKeyModel> for CardKey {
    type Error = DomainError;

    fn try_from(model: CardKeyModel) -> Result<Self, Self::Error> {
        let card_type = CardType::from_i16(model.card_type).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown card_type {}", model.card_type))
        })?;
        let status = CardStatus::from_i16(model.status).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown card status {}", model.status))
        })?;

        Ok(CardKey {
            id: CardKeyId::new(model.id),
            code: model.card_code,
            card_type,
            duration_days: model.duration,
            status,
            used_by: model.used_by.map(UserId::new),
            used_at: model.used_at,
            expire_at: model.expire_at,
            remark: model.remark,
            created_by: UserId::new(model.created_by),
            created_at: model.created_at,
        })
    }
}

/// Map a list of rows, failing on the first malformed one
pub fn card_keys_from_models(models: Vec<CardKeyModel>) -> Result<Vec<CardKey>, DomainError> {
    models.into_iter().map(CardKey::try_from).collect()
}

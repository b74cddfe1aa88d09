//! User model -> entity mapper

use ums_core::entities::{AccountStatus, User, VipLevel};
use ums_core::error::DomainError;
use ums_core::value_objects::UserId;

use crate::models::UserModel;

/// Convert UserModel to User entity
impl TryFrom<UserModel> for User {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        let status = AccountStatus::from_i16(model.status).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown user status {}", model.status))
        })?;
        let vip_level = VipLevel::from_i16(model.vip_level).ok_or_else(|| {
            DomainError::DatabaseError(format!("unknown vip_level {}", model.vip_level))
        })?;

        Ok(User {
            id: UserId::new(model.user_id),
            username: model.username,
            email: model.email,
            media_user_id: model.emby_user_id,
            role_id: model.role_id,
            status,
            vip_level,
            vip_expire_at: model.vip_expire_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Map a list of rows, failing on the first malformed one
pub fn users_from_models(models: Vec<UserModel>) -> Result<Vec<User>, DomainError> {
    models.into_iter().map(User::try_from).collect()
}

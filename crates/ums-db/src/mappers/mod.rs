//! Model to entity mappers
//!
//! `TryFrom<Model> for Entity` converts database rows to domain objects,
//! rejecting status codes the domain does not define.

mod card_key;
mod user;

pub use card_key::card_keys_from_models;
pub use user::users_from_models;

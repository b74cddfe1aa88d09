//! Database models - SQLx-compatible structs for PostgreSQL tables

mod card_key;
mod user;

pub use card_key::{CardKeyModel, StatusCountModel};
pub use user::UserModel;

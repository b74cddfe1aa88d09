//! Values exchanged with external collaborators (media server, mail)

use serde::{Deserialize, Serialize};

/// A user account as listed by the media server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUser {
    pub id: String,
    pub name: String,
}

/// Expiry warning addressed to a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryWarning {
    pub address: String,
    pub username: String,
    /// `YYYY-MM-DD HH:MM`, UTC
    pub expires_at: String,
    pub days_left: i64,
}

//! Emby media server client.

mod client;

pub use client::EmbyClient;

use ums_core::DomainError;

/// Errors talking to the media server
#[derive(Debug, thiserror::Error)]
pub enum EmbyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Emby API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

impl From<EmbyError> for DomainError {
    fn from(err: EmbyError) -> Self {
        DomainError::ExternalServiceError(err.to_string())
    }
}

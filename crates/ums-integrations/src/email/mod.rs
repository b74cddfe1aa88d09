//! Expiry warning delivery.

mod log;
mod resend;

pub use log::LogNotifier;
pub use resend::{ResendNotifier, RESEND_API_URL};

use ums_core::entities::ExpiryWarning;
use ums_core::DomainError;

/// Errors talking to the email provider
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Email API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,
}

impl From<EmailError> for DomainError {
    fn from(err: EmailError) -> Self {
        DomainError::NotificationError(err.to_string())
    }
}

/// Subject line for a VIP expiry warning
pub(crate) fn expiry_subject(warning: &ExpiryWarning) -> String {
    format!("Your VIP membership expires in {} day(s)", warning.days_left)
}

/// Minimal HTML body for a VIP expiry warning
pub(crate) fn expiry_html(warning: &ExpiryWarning) -> String {
    format!(
        "<p>Hello {},</p>\
         <p>Your VIP membership expires on <strong>{}</strong> (UTC), \
         {} day(s) from now.</p>\
         <p>Redeem a new card key before then to keep your access.</p>",
        escape_html(&warning.username),
        warning.expires_at,
        warning.days_left
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

//! # ums-integrations
//!
//! HTTP clients for the services the backend talks to:
//!
//! - **Email**: expiry warnings through the Resend API, or to the log only
//! - **Emby**: the media server's user list for account sync

pub mod email;
pub mod emby;

pub use email::{EmailError, LogNotifier, ResendNotifier, RESEND_API_URL};
pub use emby::{EmbyClient, EmbyError};

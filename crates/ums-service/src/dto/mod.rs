//! Data Transfer Objects
//!
//! Request types carry `validator` rules; response types are plain
//! serializable summaries.

mod requests;
mod responses;

pub use requests::*;
pub use responses::*;

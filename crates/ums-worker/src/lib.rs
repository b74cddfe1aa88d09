//! # ums-worker
//!
//! Process wiring: connects the stores, builds the service context, and runs
//! the periodic jobs until shutdown.

pub mod app;

pub use app::{create_scheduler, create_service_context, run, start, Runtime};

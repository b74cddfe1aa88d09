//! Bounded worker queues for fire-and-forget side effects.
//!
//! Each queue owns one consumer task, so jobs are handled in submission
//! order. Producers block for at most the configured submit timeout when the
//! queue is full; after that the job is rejected and the caller decides
//! whether to log or surface it.

mod audit;
mod notifier;
mod worker;

pub use audit::{AuditRecorder, AuditWriter};
pub use notifier::{NotifyHandler, QueuedNotifier};
pub use worker::{JobHandler, QueueError, WorkerQueue};

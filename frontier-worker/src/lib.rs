//! Frontier worker coordination core
//!
//! This crate provides the pieces that let a multi-threaded frontier worker
//! share a backend that must only be touched from one thread, and pause and
//! resume cleanly when a coordinator resets the crawl.
//!
//! ## Main Components
//!
//! - [`MainThreadOperator`] - runs closures from any thread on the main context
//! - [`ResetConsumer`] - reset / reset_done / ack handshake on the reset log
//! - [`Worker`] - wires both together and owns the main context lifecycle

pub mod context;
pub mod error;
pub mod job;
pub mod operator;
pub mod reset;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use context::WorkerContext;
pub use error::{OperatorError, WorkerError};
pub use job::{Job, JobOutcome, Runnable};
pub use operator::{MainThreadOperator, OperatorStats, DEFAULT_TICK_INTERVAL};
pub use reset::{ResetConsumer, ResetState, ResetStats};
pub use worker::{Worker, WorkerBuilder, WorkerHandle};

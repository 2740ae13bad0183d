//! Message bus interface
//!
//! A message bus exposes named append-only logs. The worker core only needs
//! two of them: the reset log, carrying operator-issued control signals, and
//! the reset-ack log, carrying this worker's acknowledgments.

use bytes::Bytes;
use std::time::Duration;

/// Error types for message bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    Transport(String),
}

impl BusError {
    /// Whether the failure is transient and the operation can be retried
    /// right away; a closed connection only recovers through backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, BusError::Transport(_))
    }
}

/// Consumer side of a log
pub trait LogConsumer: Send {
    /// Fetch up to `count` raw messages, waiting at most `timeout` for the
    /// first one to arrive. An empty vector means nothing was available.
    fn get_messages(&mut self, count: usize, timeout: Duration) -> Result<Vec<Bytes>, BusError>;
}

/// Producer side of a log
///
/// Publishing is best-effort: `Ok(())` means the payload was handed to the
/// transport, not that any consumer has seen it.
pub trait LogProducer: Send + Sync {
    fn send(&self, key: Option<&[u8]>, payload: Bytes) -> Result<(), BusError>;
}

/// A single named log on the bus
pub trait StreamLog: Send + Sync {
    fn consumer(&self) -> Result<Box<dyn LogConsumer>, BusError>;

    fn producer(&self) -> Result<Box<dyn LogProducer>, BusError>;
}

/// Message bus giving access to the control logs used by the worker
pub trait MessageBus: Send + Sync {
    /// Log carrying `reset` / `reset_done` control signals
    fn reset_log(&self) -> Result<Box<dyn StreamLog>, BusError>;

    /// Log carrying reset acknowledgments back to the signal originator
    fn reset_ack_log(&self) -> Result<Box<dyn StreamLog>, BusError>;
}

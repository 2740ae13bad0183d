//! Error types for the worker core

use thiserror::Error;

use frontier_interfaces::{BackendError, BusError, ComponentError};

/// Main-thread operator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// `perform` was called from the thread that drains the queue
    #[error("perform called from the main context; this would deadlock")]
    CalledFromMainContext,

    /// The job was dropped without producing a result
    #[error("Job was aborted before producing a result")]
    JobAborted,

    /// A job panicked while running on the main context
    #[error("Job {job_id} panicked on the main context: {message}")]
    JobPanicked { job_id: u64, message: String },
}

impl From<OperatorError> for ComponentError {
    fn from(err: OperatorError) -> Self {
        ComponentError::Job(err.to_string())
    }
}

/// Worker lifecycle errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Periodic task error: {0}")]
    Periodic(#[from] frontier_resilience::PeriodicError),

    #[error("Configuration error: {0}")]
    Config(#[from] frontier_config::ConfigError),

    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Component thread panicked: {0}")]
    ThreadPanicked(String),
}

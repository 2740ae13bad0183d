//! Backend interface
//!
//! The frontier backend holds crawl state behind sessions that must never be
//! touched from more than one thread. Every call goes through the worker's
//! main-thread operator.

/// Error types for backend operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal backend error: {0}")]
    Internal(String),
}

/// Frontier storage backend
///
/// Implementations are allowed to hold thread-affine resources. Callers must
/// only invoke these methods from the main context; the trait is `Send + Sync`
/// so the handle can be shared, not so the methods can run concurrently.
pub trait Backend: Send + Sync {
    /// Open sessions and load any state needed to serve the frontier
    fn frontier_start(&self) -> Result<(), BackendError>;

    /// Flush pending state and release sessions
    fn frontier_stop(&self) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn frontier_start(&self) -> Result<(), BackendError> {
        (**self).frontier_start()
    }

    fn frontier_stop(&self) -> Result<(), BackendError> {
        (**self).frontier_stop()
    }
}

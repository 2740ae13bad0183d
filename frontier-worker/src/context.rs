//! Shared worker collaborators handed to components

use std::sync::Arc;

use frontier_interfaces::{Backend, Codec, WorkSlot};
use frontier_resilience::StopSignal;

use crate::error::OperatorError;
use crate::operator::MainThreadOperator;

/// Collaborators every worker component may use.
///
/// Cloning is cheap; all clones refer to the same operator, backend, codec,
/// stop signal and primary slot.
#[derive(Clone)]
pub struct WorkerContext {
    pub operator: Arc<MainThreadOperator>,
    pub backend: Arc<dyn Backend>,
    pub codec: Arc<dyn Codec>,
    /// Signal paused components observe while a reset is in progress
    pub stop_signal: StopSignal,
    /// Primary scheduling loop of the worker
    pub slot: Arc<dyn WorkSlot>,
}

impl WorkerContext {
    pub fn new(
        operator: Arc<MainThreadOperator>,
        backend: Arc<dyn Backend>,
        codec: Arc<dyn Codec>,
        stop_signal: StopSignal,
        slot: Arc<dyn WorkSlot>,
    ) -> Self {
        Self {
            operator,
            backend,
            codec,
            stop_signal,
            slot,
        }
    }

    /// Run `function` on the main context, see [`MainThreadOperator::perform`]
    pub fn on_main_thread<F, R>(&self, function: F, shutdown_value: R) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.operator.perform(function, shutdown_value)
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("operator", &self.operator)
            .field("stop_signal", &self.stop_signal.is_set())
            .finish_non_exhaustive()
    }
}

//! Periodic component contract
//!
//! Worker components are driven by a cooperative periodic scheduler. The
//! scheduler invokes exactly one of the two continuations after every tick:
//! [`PeriodicComponent::run_and_reschedule`] performs the tick itself, and if
//! it fails the scheduler hands the failure to
//! [`PeriodicComponent::run_errback`]. Each component decides whether and when
//! its next tick happens.

use crate::backend::BackendError;
use crate::bus::BusError;
use crate::codec::CodecError;

/// Failure of a single component tick
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Job failed on main thread: {0}")]
    Job(String),

    #[error("Component error: {0}")]
    Internal(String),
}

/// A component driven by the periodic scheduler
pub trait PeriodicComponent: Send + Sync + 'static {
    /// Component name used in thread names and logs
    fn name(&self) -> &'static str;

    /// Run one tick, then arm the next one unless the component is stopped
    fn run_and_reschedule(&self) -> Result<(), ComponentError>;

    /// Handle a failed tick; must reschedule unless the component is stopped
    fn run_errback(&self, failure: ComponentError);
}

/// Handle re-arming the worker's primary scheduling loop
pub trait WorkSlot: Send + Sync {
    fn schedule(&self);
}

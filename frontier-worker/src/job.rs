//! Units of work dispatched to the main context

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::oneshot;

use frontier_resilience::panic_message;

/// A queued function together with its single-fire completion.
///
/// The completion channel doubles as the result slot: the result is moved
/// into it in the same step that releases the caller, so a caller can never
/// observe completion without the result.
pub struct Job<R> {
    id: u64,
    function: Box<dyn FnOnce() -> R + Send>,
    completion: oneshot::Sender<R>,
}

impl<R: Send + 'static> Job<R> {
    /// Create a job and the receiver its caller waits on
    pub fn new<F>(id: u64, function: F) -> (Self, oneshot::Receiver<R>)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let (completion, receiver) = oneshot::channel();
        let job = Self {
            id,
            function: Box::new(function),
            completion,
        };
        (job, receiver)
    }
}

/// Outcome of running one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Panicked(String),
}

/// Type-erased job as stored in the operator queue
pub trait Runnable: Send {
    fn id(&self) -> u64;

    /// Run the function, store the result and fire the completion.
    ///
    /// A panicking function drops the completion unfired, which releases the
    /// caller with an error instead of a result.
    fn execute(self: Box<Self>) -> JobOutcome;
}

impl<R: Send + 'static> Runnable for Job<R> {
    fn id(&self) -> u64 {
        self.id
    }

    fn execute(self: Box<Self>) -> JobOutcome {
        let Job {
            function,
            completion,
            ..
        } = *self;

        match panic::catch_unwind(AssertUnwindSafe(function)) {
            Ok(result) => {
                // The caller may have given up waiting (dropped future); nothing to do then
                let _ = completion.send(result);
                JobOutcome::Completed
            }
            Err(payload) => {
                drop(completion);
                JobOutcome::Panicked(panic_message(payload.as_ref()))
            }
        }
    }
}

impl<R> std::fmt::Debug for Job<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish_non_exhaustive()
    }
}

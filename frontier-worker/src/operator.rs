//! Main-thread operator
//!
//! The frontier backend keeps sessions that must only ever be touched from a
//! single thread, the *main context*. Worker components running on their own
//! threads hand closures to [`MainThreadOperator::perform`]; the main context
//! drains the queue on every tick, runs each closure in enqueue order and
//! releases the caller with its result.
//!
//! Draining is poll-based: latency of a `perform` call is bounded by the tick
//! interval, and the main thread is parked between ticks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use frontier_config::MainThreadConfig;
use frontier_interfaces::{ComponentError, PeriodicComponent};
use frontier_resilience::PeriodicTask;

use crate::error::OperatorError;
use crate::job::{Job, JobOutcome, Runnable};

/// Default delay between two drains of the queue
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Default)]
struct JobQueue {
    jobs: VecDeque<Box<dyn Runnable>>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    executed: AtomicU64,
    aborted: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of operator activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperatorStats {
    /// Number of drains performed
    pub ticks: u64,
    /// Jobs that ran to completion
    pub jobs_executed: u64,
    /// Jobs that panicked
    pub jobs_aborted: u64,
    /// `perform` calls answered with the shutdown value
    pub jobs_rejected: u64,
}

/// Executes closures on the main context on behalf of other threads
pub struct MainThreadOperator {
    queue: Mutex<JobQueue>,
    /// Held for the duration of a drain so two drains never overlap
    drain_lock: Mutex<()>,
    main_thread: Mutex<Option<ThreadId>>,
    next_job_id: AtomicU64,
    periodic_task: PeriodicTask,
    tick_interval: Duration,
    counters: Counters,
}

impl MainThreadOperator {
    pub const NAME: &'static str = "main_thread_operator";

    /// Create an open operator draining every `tick_interval`
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            queue: Mutex::new(JobQueue::default()),
            drain_lock: Mutex::new(()),
            main_thread: Mutex::new(None),
            next_job_id: AtomicU64::new(1),
            periodic_task: PeriodicTask::new(Self::NAME),
            tick_interval,
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &MainThreadConfig) -> Self {
        Self::new(config.tick_interval)
    }

    /// Execute `function` on the main context and return its result.
    ///
    /// Blocks the calling thread until the function ran. If the operator is
    /// already closed, returns `shutdown_value` immediately without running
    /// `function`.
    ///
    /// Must not be called from the main context (returns
    /// [`OperatorError::CalledFromMainContext`]) nor from inside an async
    /// runtime; async callers use [`MainThreadOperator::perform_async`].
    pub fn perform<F, R>(&self, function: F, shutdown_value: R) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.enqueue(function)? {
            Some(receiver) => receiver.blocking_recv().map_err(|_| OperatorError::JobAborted),
            None => Ok(shutdown_value),
        }
    }

    /// Async counterpart of [`MainThreadOperator::perform`].
    ///
    /// Dropping the returned future does not remove the job from the queue;
    /// the function still runs on the next tick and its result is discarded.
    pub async fn perform_async<F, R>(
        &self,
        function: F,
        shutdown_value: R,
    ) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.enqueue(function)? {
            Some(receiver) => receiver.await.map_err(|_| OperatorError::JobAborted),
            None => Ok(shutdown_value),
        }
    }

    /// Place a job in the queue; `None` when closed.
    ///
    /// The closed check and the push happen under the queue lock, so a job is
    /// either visible to the final flush in [`MainThreadOperator::close`] or
    /// rejected.
    fn enqueue<F, R>(&self, function: F) -> Result<Option<oneshot::Receiver<R>>, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut queue = self.queue.lock();
        if queue.closed {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }
        if self.is_main_thread() {
            return Err(OperatorError::CalledFromMainContext);
        }

        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let (job, receiver) = Job::new(id, function);
        queue.jobs.push_back(Box::new(job));
        Ok(Some(receiver))
    }

    /// Arm the next drain `delay` from now
    pub fn schedule(&self, delay: Duration) {
        self.periodic_task.schedule(delay);
    }

    /// Drain the queue once.
    ///
    /// Takes every job queued at this instant and runs them in enqueue order.
    /// Jobs queued while the drain is in progress wait for the next tick. If
    /// a job panics, its caller is released with [`OperatorError::JobAborted`]
    /// and the jobs after it go back to the front of the queue, still in
    /// enqueue order. The panic is reported as [`OperatorError::JobPanicked`].
    ///
    /// Returns the number of jobs that completed.
    pub fn run(&self) -> Result<usize, OperatorError> {
        let _drain = self.drain_lock.lock();
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let jobs = std::mem::take(&mut self.queue.lock().jobs);
        if jobs.is_empty() {
            return Ok(0);
        }

        debug!(jobs = jobs.len(), "Draining main thread queue");

        let mut executed = 0;
        let mut jobs = jobs.into_iter();
        while let Some(job) = jobs.next() {
            let job_id = job.id();
            match job.execute() {
                JobOutcome::Completed => {
                    executed += 1;
                    self.counters.executed.fetch_add(1, Ordering::Relaxed);
                }
                JobOutcome::Panicked(message) => {
                    self.counters.aborted.fetch_add(1, Ordering::Relaxed);
                    self.requeue_front(jobs.collect());
                    return Err(OperatorError::JobPanicked { job_id, message });
                }
            }
        }

        Ok(executed)
    }

    fn requeue_front(&self, remaining: Vec<Box<dyn Runnable>>) {
        if remaining.is_empty() {
            return;
        }
        warn!(jobs = remaining.len(), "Requeueing jobs left over from a failed drain");

        let mut queue = self.queue.lock();
        for job in remaining.into_iter().rev() {
            queue.jobs.push_front(job);
        }
    }

    /// Stop accepting jobs and flush those already queued.
    ///
    /// Keeps draining until the queue is empty, so a panicking job during the
    /// final flush cannot strand the callers queued behind it. The periodic
    /// task is stopped afterwards, which releases a thread parked in
    /// [`MainThreadOperator::drive`]. Calling `close` again is harmless: the
    /// queue is already empty and closed.
    pub fn close(&self) {
        let pending = {
            let mut queue = self.queue.lock();
            queue.closed = true;
            queue.jobs.len()
        };

        if pending > 0 {
            info!(pending, "Closing main thread operator, flushing pending jobs");
        }

        loop {
            match self.run() {
                Ok(_) => break,
                Err(err) => error!(error = %err, "Job failed during final flush"),
            }
        }

        self.periodic_task.stop();
    }

    /// Whether the operator has been closed
    pub fn stopped(&self) -> bool {
        self.queue.lock().closed
    }

    /// Number of jobs waiting for the next drain
    pub fn pending(&self) -> usize {
        self.queue.lock().jobs.len()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Periodic task driving the drains
    pub fn periodic_task(&self) -> &PeriodicTask {
        &self.periodic_task
    }

    /// Declare the current thread as the main context
    pub fn bind_main_thread(&self) {
        *self.main_thread.lock() = Some(thread::current().id());
    }

    /// Whether the current thread is the main context
    pub fn is_main_thread(&self) -> bool {
        *self.main_thread.lock() == Some(thread::current().id())
    }

    /// Bind the current thread as the main context and drain on every tick
    /// until the periodic task is stopped or the operator is closed
    pub fn drive(&self) {
        self.bind_main_thread();
        self.periodic_task.drive(self);
    }

    pub fn stats(&self) -> OperatorStats {
        OperatorStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            jobs_executed: self.counters.executed.load(Ordering::Relaxed),
            jobs_aborted: self.counters.aborted.load(Ordering::Relaxed),
            jobs_rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for MainThreadOperator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl PeriodicComponent for MainThreadOperator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run_and_reschedule(&self) -> Result<(), ComponentError> {
        if !self.stopped() {
            self.run()?;
            self.schedule(self.tick_interval);
        }
        Ok(())
    }

    fn run_errback(&self, failure: ComponentError) {
        error!(component = Self::NAME, error = %failure, "Main thread tick failed");
        if !self.stopped() {
            self.schedule(self.tick_interval);
        }
    }
}

impl std::fmt::Debug for MainThreadOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThreadOperator")
            .field("pending", &self.pending())
            .field("stopped", &self.stopped())
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}

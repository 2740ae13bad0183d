//! Reset consumer
//!
//! Listens on the reset log for control signals issued by a coordinator.
//! On `reset` it pauses the sibling components through the shared stop
//! signal, gives them a grace period to quiesce, flushes the backend on the
//! main context and acknowledges on the reset-ack log. The worker resumes on
//! `reset_done`, or on its own once the reset timeout has passed.
//!
//! ```text
//!            reset                          reset_done | timeout
//!   Normal ─────────▶ Resetting { since } ─────────────────────▶ Normal
//!    set stop signal, grace period,          flush backend, clear stop
//!    flush backend, ack                      signal, re-arm primary slot
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use frontier_config::ResetConfig;
use frontier_interfaces::{
    BackendError, BusError, ComponentError, ControlMessage, LogConsumer, LogProducer, MessageBus,
    PeriodicComponent,
};
use frontier_resilience::{Clock, PeriodicTask, StopSignal, SystemClock};

use crate::context::WorkerContext;

/// Protocol state of the reset consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetState {
    #[default]
    Normal,
    /// Paused since the given instant, waiting for `reset_done` or timeout
    Resetting { since: Instant },
}

impl ResetState {
    pub fn is_resetting(&self) -> bool {
        matches!(self, ResetState::Resetting { .. })
    }
}

#[derive(Debug, Default)]
struct ResetCounters {
    resets: AtomicU64,
    resumes: AtomicU64,
    timeouts: AtomicU64,
    acks_sent: AtomicU64,
    backend_cycles: AtomicU64,
    decode_failures: AtomicU64,
}

/// Snapshot of reset consumer activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetStats {
    pub resets: u64,
    pub resumes: u64,
    /// Resumes triggered by the reset timeout rather than `reset_done`
    pub timeouts: u64,
    pub acks_sent: u64,
    /// Completed backend stop/start cycles
    pub backend_cycles: u64,
    pub decode_failures: u64,
}

/// Periodic component driving the reset handshake
pub struct ResetConsumer {
    context: WorkerContext,
    config: ResetConfig,
    clock: Arc<dyn Clock>,
    consumer: Mutex<Box<dyn LogConsumer>>,
    producer: Box<dyn LogProducer>,
    state: Mutex<ResetState>,
    started: AtomicBool,
    /// Own stop condition, distinct from the shared signal in the context
    stop: StopSignal,
    periodic_task: PeriodicTask,
    counters: ResetCounters,
}

impl ResetConsumer {
    pub const NAME: &'static str = "reset";

    /// Open the reset and reset-ack logs on `bus`
    pub fn new(
        context: WorkerContext,
        bus: &dyn MessageBus,
        config: ResetConfig,
    ) -> Result<Self, BusError> {
        Self::with_clock(context, bus, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        context: WorkerContext,
        bus: &dyn MessageBus,
        config: ResetConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BusError> {
        let consumer = bus.reset_log()?.consumer()?;
        let producer = bus.reset_ack_log()?.producer()?;

        Ok(Self {
            context,
            config,
            clock,
            consumer: Mutex::new(consumer),
            producer,
            state: Mutex::new(ResetState::Normal),
            started: AtomicBool::new(false),
            stop: StopSignal::new(),
            periodic_task: PeriodicTask::new(Self::NAME),
            counters: ResetCounters::default(),
        })
    }

    /// Arm polling. Only the first call after construction or [`close`]
    /// has an effect.
    ///
    /// [`close`]: ResetConsumer::close
    pub fn schedule(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop.clear();
        self.periodic_task.schedule(Duration::ZERO);
    }

    /// Poll the reset log once and advance the protocol.
    ///
    /// Runs on the consumer's own thread. Blocks for up to the poll timeout
    /// while waiting for a message, for the grace period on `reset`, and for
    /// each backend flush on the main context.
    pub fn run(&self) -> Result<(), ComponentError> {
        let messages = self.consumer.lock().get_messages(1, self.config.poll_timeout)?;

        let mut resume_due = false;
        for raw in &messages {
            match self.context.codec.decode(raw) {
                Ok(ControlMessage::Reset) => self.begin_reset(),
                Ok(ControlMessage::ResetDone) => {
                    info!("Got reset_done signal, resuming worker");
                    resume_due = true;
                }
                Ok(other) => debug!(message = %other, "Ignoring control message on reset log"),
                Err(err) => {
                    self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                    error!(error = %err, "Failed to decode reset log message, skipping");
                }
            }
        }

        if let ResetState::Resetting { since } = self.state() {
            if self.clock.elapsed_since(since) > self.config.reset_timeout {
                warn!(
                    timeout_secs = self.config.reset_timeout.as_secs_f64(),
                    "Considering reset done because of timeout, resuming worker"
                );
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                resume_due = true;
            }
        }

        if resume_due {
            self.resume();
        }
        Ok(())
    }

    fn begin_reset(&self) {
        info!("Reset signal received, pausing worker, flushing backend and acknowledging");
        self.context.stop_signal.set();

        if !self.config.grace_period.is_zero() {
            thread::sleep(self.config.grace_period);
        }

        self.flush_backend();
        self.send_ack();

        *self.state.lock() = ResetState::Resetting {
            since: self.clock.now(),
        };
        self.counters.resets.fetch_add(1, Ordering::Relaxed);
    }

    fn resume(&self) {
        self.flush_backend();

        *self.state.lock() = ResetState::Normal;
        self.context.stop_signal.clear();
        self.context.slot.schedule();

        self.counters.resumes.fetch_add(1, Ordering::Relaxed);
        info!("Worker resumed");
    }

    /// Stop and restart the backend on the main context
    fn flush_backend(&self) {
        let backend = self.context.backend.clone();
        let cycle = move || -> Option<Result<(), BackendError>> {
            Some(backend.frontier_stop().and_then(|_| backend.frontier_start()))
        };

        match self.context.on_main_thread(cycle, None) {
            Ok(Some(Ok(()))) => {
                self.counters.backend_cycles.fetch_add(1, Ordering::Relaxed);
                debug!("Backend flushed");
            }
            Ok(Some(Err(err))) => error!(error = %err, "Backend flush failed"),
            Ok(None) => warn!("Main thread operator is closed, backend flush skipped"),
            Err(err) => error!(error = %err, "Backend flush did not complete"),
        }
    }

    fn send_ack(&self) {
        let payload = match self.context.codec.encode_reset_ack() {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, "Failed to encode reset ack");
                return;
            }
        };

        match self.producer.send(None, payload) {
            Ok(()) => {
                self.counters.acks_sent.fetch_add(1, Ordering::Relaxed);
                debug!("Reset ack sent");
            }
            Err(err) => error!(error = %err, "Failed to publish reset ack"),
        }
    }

    /// Set the own stop condition and allow a later [`ResetConsumer::schedule`]
    pub fn close(&self) {
        self.stop.set();
        self.started.store(false, Ordering::SeqCst);
    }

    /// Whether the own stop condition is set
    pub fn stopped(&self) -> bool {
        self.stop.is_set()
    }

    pub fn state(&self) -> ResetState {
        *self.state.lock()
    }

    pub fn is_resetting(&self) -> bool {
        self.state().is_resetting()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn periodic_task(&self) -> &PeriodicTask {
        &self.periodic_task
    }

    pub fn stats(&self) -> ResetStats {
        ResetStats {
            resets: self.counters.resets.load(Ordering::Relaxed),
            resumes: self.counters.resumes.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            acks_sent: self.counters.acks_sent.load(Ordering::Relaxed),
            backend_cycles: self.counters.backend_cycles.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
        }
    }
}

impl ResetConsumer {
    /// Delay before polling again after a failed tick
    fn retry_delay(&self, failure: &ComponentError) -> Duration {
        match failure {
            ComponentError::Bus(err) if err.is_retryable() => self.config.poll_interval,
            _ => self.config.poll_timeout,
        }
    }
}

impl PeriodicComponent for ResetConsumer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run_and_reschedule(&self) -> Result<(), ComponentError> {
        if !self.stopped() {
            self.run()?;
            if !self.stopped() {
                self.periodic_task.schedule(self.config.poll_interval);
            }
        }
        Ok(())
    }

    fn run_errback(&self, failure: ComponentError) {
        error!(component = Self::NAME, error = %failure, "Reset consumer tick failed");
        if !self.stopped() {
            self.periodic_task.schedule(self.retry_delay(&failure));
        }
    }
}

impl std::fmt::Debug for ResetConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetConsumer")
            .field("state", &self.state())
            .field("started", &self.is_started())
            .field("stopped", &self.stopped())
            .finish_non_exhaustive()
    }
}

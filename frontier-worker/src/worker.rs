//! Worker lifecycle
//!
//! A [`Worker`] wires the main-thread operator, the reset consumer and the
//! shared collaborators together. The thread calling [`Worker::run`] becomes
//! the main context: it starts the backend, drains the operator queue until
//! shutdown is requested, flushes what is left and stops the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use frontier_bus::{InMemoryMessageBus, JsonCodec};
use frontier_config::FrontierConfig;
use frontier_interfaces::{Backend, Codec, MessageBus, WorkSlot};
use frontier_resilience::{panic_message, Clock, PeriodicTask, StopSignal, SystemClock};

use crate::context::WorkerContext;
use crate::error::{OperatorError, WorkerError};
use crate::operator::MainThreadOperator;
use crate::reset::ResetConsumer;

/// Builder for [`Worker`]
pub struct WorkerBuilder {
    backend: Arc<dyn Backend>,
    config: FrontierConfig,
    bus: Option<Arc<dyn MessageBus>>,
    codec: Option<Arc<dyn Codec>>,
    slot: Option<Arc<dyn WorkSlot>>,
    clock: Option<Arc<dyn Clock>>,
}

impl WorkerBuilder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            config: FrontierConfig::default(),
            bus: None,
            codec: None,
            slot: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: FrontierConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `bus` instead of an in-memory bus built from the configuration
    pub fn message_bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Primary scheduling loop re-armed after a reset
    pub fn slot(mut self, slot: Arc<dyn WorkSlot>) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and assemble the worker
    pub fn build(self) -> Result<Worker, WorkerError> {
        self.config.validate_all()?;

        let bus = self.bus.unwrap_or_else(|| {
            let settings = &self.config.message_bus;
            let bus =
                InMemoryMessageBus::with_topics(&settings.reset_topic, &settings.reset_ack_topic);
            let bus = match settings.capacity {
                Some(capacity) => bus.with_capacity(capacity),
                None => bus,
            };
            Arc::new(bus)
        });
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec::new()));
        let slot = self
            .slot
            .unwrap_or_else(|| Arc::new(PeriodicTask::new("worker_slot")));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let operator = Arc::new(MainThreadOperator::from_config(&self.config.main_thread));
        let context = WorkerContext::new(operator, self.backend, codec, StopSignal::new(), slot);
        let reset_consumer = Arc::new(ResetConsumer::with_clock(
            context.clone(),
            bus.as_ref(),
            self.config.reset.clone(),
            clock,
        )?);

        Ok(Worker {
            context,
            bus,
            reset_consumer,
            reset_thread: Mutex::new(None),
            running: AtomicBool::new(false),
            config: self.config,
        })
    }
}

/// Frontier worker hosting the main context and the reset consumer
pub struct Worker {
    context: WorkerContext,
    bus: Arc<dyn MessageBus>,
    reset_consumer: Arc<ResetConsumer>,
    reset_thread: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
    config: FrontierConfig,
}

impl Worker {
    pub fn builder(backend: Arc<dyn Backend>) -> WorkerBuilder {
        WorkerBuilder::new(backend)
    }

    /// Worker with default collaborators and the given configuration
    pub fn new(backend: Arc<dyn Backend>, config: FrontierConfig) -> Result<Self, WorkerError> {
        Self::builder(backend).config(config).build()
    }

    /// Run `function` on the main context and return its result, or
    /// `shutdown_value` once the worker is shutting down
    pub fn on_main_thread<F, R>(&self, function: F, shutdown_value: R) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.context.on_main_thread(function, shutdown_value)
    }

    /// Spawn the reset consumer thread and arm every component
    pub fn start(&self) -> Result<(), WorkerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyRunning);
        }

        let handle = self
            .reset_consumer
            .periodic_task()
            .spawn(self.reset_consumer.clone())
            .inspect_err(|_| self.running.store(false, Ordering::SeqCst))?;
        *self.reset_thread.lock() = Some(handle);

        self.reset_consumer.schedule();
        self.context.operator.schedule(self.config.main_thread.initial_delay);
        self.context.slot.schedule();

        info!(
            tick_interval_ms = self.config.main_thread.tick_interval.as_millis() as u64,
            "Frontier worker started"
        );
        Ok(())
    }

    /// Make the calling thread the main context and serve it until shutdown.
    ///
    /// Starts the worker first if [`Worker::start`] was not called yet.
    /// Returns after the operator has been closed, the backend stopped and
    /// the reset consumer thread joined.
    pub fn run(&self) -> Result<(), WorkerError> {
        self.context.operator.bind_main_thread();
        if let Err(err) = self.context.backend.frontier_start() {
            error!(error = %err, "Backend failed to start");
            self.release_components();
            if let Err(join_err) = self.join_reset_thread() {
                warn!(error = %join_err, "Reset consumer did not stop cleanly");
            }
            return Err(err.into());
        }

        let shutdown_requested = self.context.operator.periodic_task().is_stopped();
        if !self.is_running() && !shutdown_requested {
            if let Err(err) = self.start() {
                if let Err(teardown) = self.finish() {
                    warn!(error = %teardown, "Teardown after failed start did not complete");
                }
                return Err(err);
            }
        }

        self.context.operator.drive();
        self.finish()
    }

    /// Tear down after the main driver returned; runs on the main context
    fn finish(&self) -> Result<(), WorkerError> {
        debug!("Main context released, shutting down worker");

        self.release_components();

        let stopped = self.context.backend.frontier_stop();
        if let Err(err) = &stopped {
            warn!(error = %err, "Backend failed to stop cleanly");
        }

        let joined = self.join_reset_thread();
        info!(stats = ?self.context.operator.stats(), "Frontier worker stopped");

        joined?;
        stopped?;
        Ok(())
    }

    /// Stop the reset consumer and close the operator, flushing its queue
    fn release_components(&self) {
        self.reset_consumer.close();
        self.reset_consumer.periodic_task().stop();
        self.context.operator.close();
    }

    fn join_reset_thread(&self) -> Result<(), WorkerError> {
        let handle = self.reset_thread.lock().take();
        let joined = match handle {
            Some(handle) => handle
                .join()
                .map_err(|payload| WorkerError::ThreadPanicked(panic_message(payload.as_ref()))),
            None => Ok(()),
        };
        self.running.store(false, Ordering::SeqCst);
        joined
    }

    /// Request shutdown; [`Worker::run`] returns once teardown completed
    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            context: self.context.clone(),
            reset_consumer: self.reset_consumer.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    pub fn operator(&self) -> &Arc<MainThreadOperator> {
        &self.context.operator
    }

    pub fn reset_consumer(&self) -> &Arc<ResetConsumer> {
        &self.reset_consumer
    }

    /// Signal observed by components paused during a reset
    pub fn stop_signal(&self) -> &StopSignal {
        &self.context.stop_signal
    }

    pub fn message_bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    pub fn config(&self) -> &FrontierConfig {
        &self.config
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.is_running())
            .field("operator", &self.context.operator)
            .field("reset_consumer", &self.reset_consumer)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle for other threads
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    context: WorkerContext,
    reset_consumer: Arc<ResetConsumer>,
}

impl WorkerHandle {
    pub fn on_main_thread<F, R>(&self, function: F, shutdown_value: R) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.context.on_main_thread(function, shutdown_value)
    }

    pub async fn on_main_thread_async<F, R>(
        &self,
        function: F,
        shutdown_value: R,
    ) -> Result<R, OperatorError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.context.operator.perform_async(function, shutdown_value).await
    }

    /// Stop polling for resets and release the main context.
    ///
    /// The operator itself is closed by the main context when [`Worker::run`]
    /// unwinds, so every job queued before that point still runs.
    pub fn shutdown(&self) {
        info!("Frontier worker shutdown requested");
        self.reset_consumer.close();
        self.reset_consumer.periodic_task().stop();
        self.context.operator.periodic_task().stop();
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.context.stop_signal
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }
}

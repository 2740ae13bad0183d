//! Cooperative periodic task driver
//!
//! A [`PeriodicTask`] owns at most one pending tick. [`PeriodicTask::schedule`]
//! arms it after a delay; the thread driving the task parks until the deadline,
//! invokes the component and lets the component decide whether to arm the
//! next tick. There is no global event loop: every component reschedules
//! itself, and a task that nobody reschedules simply goes idle.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use frontier_interfaces::{ComponentError, PeriodicComponent, WorkSlot};

/// Periodic driver error types
#[derive(Debug, thiserror::Error)]
pub enum PeriodicError {
    /// Failed to spawn the driver thread
    #[error("Failed to spawn driver thread for {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Task was stopped before it could be driven
    #[error("Periodic task {0} is stopped")]
    Stopped(String),
}

#[derive(Debug, Default)]
struct TaskState {
    next_run: Option<Instant>,
    stopped: bool,
    ticks: u64,
}

#[derive(Debug)]
struct Shared {
    name: String,
    state: Mutex<TaskState>,
    wakeup: Condvar,
}

/// Handle to a periodic task; clones drive and schedule the same task
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    shared: Arc<Shared>,
}

impl PeriodicTask {
    /// Create an idle periodic task
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(TaskState::default()),
                wakeup: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Arm the next tick `delay` from now.
    ///
    /// If a tick is already pending the earlier deadline wins, so repeated
    /// scheduling never queues more than one tick. Ignored once stopped.
    pub fn schedule(&self, delay: Duration) {
        let mut state = self.shared.state.lock();
        if state.stopped {
            return;
        }
        let at = Instant::now() + delay;
        state.next_run = Some(match state.next_run {
            Some(pending) if pending <= at => pending,
            _ => at,
        });
        self.shared.wakeup.notify_all();
    }

    /// Whether a tick is armed and has not fired yet
    pub fn is_scheduled(&self) -> bool {
        self.shared.state.lock().next_run.is_some()
    }

    /// Stop the task: pending ticks are dropped and drivers return
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.stopped = true;
        state.next_run = None;
        self.shared.wakeup.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }

    /// Number of ticks fired so far
    pub fn ticks(&self) -> u64 {
        self.shared.state.lock().ticks
    }

    /// Drive `component` on the current thread until the task is stopped.
    ///
    /// Each fired tick calls [`PeriodicComponent::run_and_reschedule`]; a
    /// failed or panicking tick is handed to [`PeriodicComponent::run_errback`].
    pub fn drive<C>(&self, component: &C)
    where
        C: PeriodicComponent + ?Sized,
    {
        debug!("Driving periodic task {}", self.name());

        while self.wait_for_tick() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| component.run_and_reschedule()));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => component.run_errback(failure),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!("Tick of {} panicked: {}", component.name(), message);
                    let failure = ComponentError::Internal(format!("tick panicked: {}", message));
                    component.run_errback(failure);
                }
            }
        }

        debug!("Periodic task {} stopped", self.name());
    }

    /// Drive `component` on a dedicated, named thread
    pub fn spawn<C>(&self, component: Arc<C>) -> Result<JoinHandle<()>, PeriodicError>
    where
        C: PeriodicComponent + ?Sized,
    {
        if self.is_stopped() {
            return Err(PeriodicError::Stopped(self.name().to_string()));
        }

        let task = self.clone();
        thread::Builder::new()
            .name(format!("frontier-{}", component.name()))
            .spawn(move || task.drive(component.as_ref()))
            .map_err(|source| PeriodicError::Spawn {
                name: self.name().to_string(),
                source,
            })
    }

    /// Park until the pending deadline passes. Returns false once stopped.
    fn wait_for_tick(&self) -> bool {
        let mut state = self.shared.state.lock();
        loop {
            if state.stopped {
                return false;
            }
            let next_run = state.next_run;
            match next_run {
                None => self.shared.wakeup.wait(&mut state),
                Some(at) => {
                    if at <= Instant::now() {
                        state.next_run = None;
                        state.ticks += 1;
                        return true;
                    }
                    let _ = self.shared.wakeup.wait_until(&mut state, at);
                }
            }
        }
    }
}

impl WorkSlot for PeriodicTask {
    fn schedule(&self) {
        PeriodicTask::schedule(self, Duration::ZERO);
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingComponent {
        task: PeriodicTask,
        runs: AtomicU32,
        errbacks: AtomicU32,
        fail_on: Option<u32>,
        panic_on: Option<u32>,
        limit: u32,
    }

    impl CountingComponent {
        fn new(task: PeriodicTask, limit: u32) -> Self {
            Self {
                task,
                runs: AtomicU32::new(0),
                errbacks: AtomicU32::new(0),
                fail_on: None,
                panic_on: None,
                limit,
            }
        }

        fn reschedule(&self) {
            if self.runs.load(Ordering::SeqCst) >= self.limit {
                self.task.stop();
            } else {
                self.task.schedule(Duration::from_millis(1));
            }
        }
    }

    impl PeriodicComponent for CountingComponent {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn run_and_reschedule(&self) -> Result<(), ComponentError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(run) {
                return Err(ComponentError::Internal("boom".to_string()));
            }
            if self.panic_on == Some(run) {
                panic!("tick {} exploded", run);
            }
            self.reschedule();
            Ok(())
        }

        fn run_errback(&self, _failure: ComponentError) {
            self.errbacks.fetch_add(1, Ordering::SeqCst);
            self.reschedule();
        }
    }

    #[test]
    fn test_schedule_keeps_earliest_deadline() {
        let task = PeriodicTask::new("test");
        assert!(!task.is_scheduled());

        task.schedule(Duration::from_secs(10));
        task.schedule(Duration::from_millis(1));
        task.schedule(Duration::from_secs(20));
        assert!(task.is_scheduled());

        let deadline = task.shared.state.lock().next_run.unwrap();
        assert!(deadline <= Instant::now() + Duration::from_secs(1));
    }

    #[test]
    fn test_schedule_ignored_after_stop() {
        let task = PeriodicTask::new("test");
        task.stop();
        task.schedule(Duration::ZERO);
        assert!(!task.is_scheduled());
        assert!(task.is_stopped());
    }

    #[test]
    fn test_drive_runs_until_stopped() {
        let task = PeriodicTask::new("counting");
        let component = Arc::new(CountingComponent::new(task.clone(), 5));

        task.schedule(Duration::ZERO);
        let handle = task.spawn(component.clone()).unwrap();
        handle.join().unwrap();

        assert_eq!(component.runs.load(Ordering::SeqCst), 5);
        assert_eq!(task.ticks(), 5);
        assert_eq!(component.errbacks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_tick_goes_to_errback_and_loop_survives() {
        let task = PeriodicTask::new("counting");
        let mut component = CountingComponent::new(task.clone(), 4);
        component.fail_on = Some(2);
        let component = Arc::new(component);

        task.schedule(Duration::ZERO);
        task.spawn(component.clone()).unwrap().join().unwrap();

        assert_eq!(component.runs.load(Ordering::SeqCst), 4);
        assert_eq!(component.errbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_tick_goes_to_errback() {
        let task = PeriodicTask::new("counting");
        let mut component = CountingComponent::new(task.clone(), 3);
        component.panic_on = Some(1);
        let component = Arc::new(component);

        task.schedule(Duration::ZERO);
        task.spawn(component.clone()).unwrap().join().unwrap();

        assert_eq!(component.runs.load(Ordering::SeqCst), 3);
        assert_eq!(component.errbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_releases_idle_driver() {
        let task = PeriodicTask::new("counting");
        let component = Arc::new(CountingComponent::new(task.clone(), 100));

        // Never scheduled: the driver parks until stopped
        let handle = task.spawn(component.clone()).unwrap();
        thread::sleep(Duration::from_millis(20));
        task.stop();
        handle.join().unwrap();

        assert_eq!(component.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_spawn_after_stop_fails() {
        let task = PeriodicTask::new("counting");
        let component = Arc::new(CountingComponent::new(task.clone(), 1));
        task.stop();
        assert!(matches!(task.spawn(component), Err(PeriodicError::Stopped(_))));
    }

    #[test]
    fn test_work_slot_schedules_immediately() {
        let task = PeriodicTask::new("slot");
        let slot: &dyn WorkSlot = &task;
        slot.schedule();
        assert!(task.is_scheduled());
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}

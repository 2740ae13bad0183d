//! Test doubles for worker collaborators
//!
//! Available to unit tests and, through the `testing` feature, to the
//! integration test crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use frontier_interfaces::{Backend, BackendError, WorkSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    Start,
    Stop,
}

/// A backend call together with the thread it ran on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEvent {
    pub call: BackendCall,
    pub thread: ThreadId,
}

/// Backend recording every call it receives
#[derive(Debug, Default)]
pub struct RecordingBackend {
    events: Mutex<Vec<BackendEvent>>,
    failing: AtomicBool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with a storage error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().clone()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.events.lock().iter().map(|event| event.call).collect()
    }

    pub fn count(&self, call: BackendCall) -> usize {
        self.events.lock().iter().filter(|event| event.call == call).count()
    }

    /// Whether every recorded call ran on `thread`
    pub fn all_on(&self, thread: ThreadId) -> bool {
        self.events.lock().iter().all(|event| event.thread == thread)
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        self.events.lock().push(BackendEvent {
            call,
            thread: thread::current().id(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Storage("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Backend for RecordingBackend {
    fn frontier_start(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Start)
    }

    fn frontier_stop(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Stop)
    }
}

/// Work slot counting how often it was re-armed
#[derive(Debug, Default)]
pub struct CountingSlot {
    scheduled: AtomicUsize,
}

impl CountingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }
}

impl WorkSlot for CountingSlot {
    fn schedule(&self) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }
}

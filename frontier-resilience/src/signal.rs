//! Stop signals shared between worker components
//!
//! A [`StopSignal`] is a cloneable, level-triggered flag. Setting it wakes
//! every thread blocked in [`StopSignal::wait_timeout`]; clearing it lets
//! components resume on their next tick.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct SignalState {
    flag: Mutex<bool>,
    changed: Condvar,
}

/// Level-triggered stop flag shared across threads
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    state: Arc<SignalState>,
}

impl StopSignal {
    /// Create a new, cleared stop signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake all waiters
    pub fn set(&self) {
        let mut flag = self.state.flag.lock();
        *flag = true;
        self.state.changed.notify_all();
    }

    /// Lower the signal
    pub fn clear(&self) {
        *self.state.flag.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.state.flag.lock()
    }

    /// Block until the signal is set or `timeout` elapses.
    ///
    /// Returns whether the signal was set on return.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut flag = self.state.flag.lock();
        if *flag {
            return true;
        }
        let _ = self.state.changed.wait_for(&mut flag, timeout);
        *flag
    }
}

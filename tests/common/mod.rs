//! Shared helpers for the frontier integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use frontier_config::FrontierConfig;
use frontier_worker::Worker;

/// Configuration with short ticks and no grace period
pub fn fast_config() -> FrontierConfig {
    let mut config = FrontierConfig::default();
    config.main_thread.tick_interval = Duration::from_millis(1);
    config.main_thread.initial_delay = Duration::ZERO;
    config.reset.poll_interval = Duration::from_millis(1);
    config.reset.poll_timeout = Duration::from_millis(10);
    config.reset.grace_period = Duration::ZERO;
    config
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Run the worker on a dedicated thread, which becomes its main context
pub fn spawn_main(worker: &Arc<Worker>) -> JoinHandle<(thread::ThreadId, Result<()>)> {
    let worker = worker.clone();
    thread::Builder::new()
        .name("frontier-main".to_string())
        .spawn(move || {
            let result = worker.run().map_err(anyhow::Error::from);
            (thread::current().id(), result)
        })
        .expect("spawn main context thread")
}

//! Resilience primitives for the frontier worker
//!
//! This crate provides the pieces worker components use to stay alive and
//! coordinate with each other: level-triggered stop signals, a cooperative
//! periodic task driver, and a clock abstraction for protocol deadlines.

pub mod clock;
pub mod periodic;
pub mod signal;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use periodic::{panic_message, PeriodicError, PeriodicTask};
pub use signal::StopSignal;

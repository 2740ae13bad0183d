//! Structured logging initialisation for the frontier worker
//!
//! Worker components log through `tracing` (or `log`, bridged into
//! `tracing`); this crate installs the global subscriber from the
//! `logging` configuration domain.

pub mod init;

// Re-export main functions for convenience
pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing, init_test_tracing};

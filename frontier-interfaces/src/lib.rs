//! # Frontier Interfaces
//!
//! Collaborator interfaces consumed by the frontier worker coordination core.
//!
//! The worker core never owns a storage engine or a broker implementation.
//! It talks to them through the traits defined here, which keeps the
//! main-thread dispatch and reset protocol independent of any concrete
//! backend or transport.
//!
//! ## Main Interfaces
//!
//! - [`Backend`] - frontier storage backend, not safe for concurrent access
//! - [`MessageBus`] - access to the reset and reset-ack logs
//! - [`Codec`] - decoding of control messages read from the reset log
//! - [`PeriodicComponent`] - contract driven by the periodic scheduler
//! - [`WorkSlot`] - re-arms the worker's primary scheduling loop

pub mod backend;
pub mod bus;
pub mod codec;
pub mod component;

// Re-export commonly used types
pub use backend::{Backend, BackendError};
pub use bus::{BusError, LogConsumer, LogProducer, MessageBus, StreamLog};
pub use codec::{Codec, CodecError, ControlMessage};
pub use component::{ComponentError, PeriodicComponent, WorkSlot};

//! Message bus and control codec for the frontier worker
//!
//! This crate provides the control protocol envelope, a JSON codec for the
//! reset handshake, and an in-process message bus used by single-host
//! deployments and tests.

pub mod memory;
pub mod protocol;

// Re-export commonly used types
pub use memory::{
    InMemoryConsumer, InMemoryLog, InMemoryMessageBus, InMemoryProducer, Record,
    DEFAULT_RESET_ACK_TOPIC, DEFAULT_RESET_TOPIC,
};
pub use protocol::{JsonCodec, MessageEnvelope, CONTROL_PROTOCOL_VERSION};

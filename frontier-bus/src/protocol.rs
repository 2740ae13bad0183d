//! Control protocol envelope and JSON codec

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use frontier_interfaces::{Codec, CodecError, ControlMessage};

/// Control protocol version for compatibility checking
pub const CONTROL_PROTOCOL_VERSION: u32 = 1;

/// Message envelope for everything published on the control logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: CONTROL_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == CONTROL_PROTOCOL_VERSION
    }
}

/// JSON codec for control messages
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn decode(&self, raw: &[u8]) -> Result<ControlMessage, CodecError> {
        let envelope: MessageEnvelope<ControlMessage> =
            serde_json::from_slice(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;

        if !envelope.is_compatible() {
            return Err(CodecError::ProtocolVersionMismatch {
                expected: CONTROL_PROTOCOL_VERSION,
                actual: envelope.protocol_version,
            });
        }

        Ok(envelope.message)
    }

    fn encode(&self, message: ControlMessage) -> Result<Bytes, CodecError> {
        let json = serde_json::to_vec(&MessageEnvelope::new(message))
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        Ok(Bytes::from(json))
    }
}

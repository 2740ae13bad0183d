//! Control message codec interface

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Control signals exchanged over the reset and reset-ack logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Pause the worker and flush the backend
    Reset,

    /// The originator finished its side of the reset, resume work
    ResetDone,

    /// Worker acknowledgment that it entered the resetting state
    ResetAck,
}

impl ControlMessage {
    /// Tag used on the wire and in logs
    pub fn tag(&self) -> &'static str {
        match self {
            ControlMessage::Reset => "reset",
            ControlMessage::ResetDone => "reset_done",
            ControlMessage::ResetAck => "reset_ack",
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error types for encoding and decoding control messages
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Encodes and decodes control messages
pub trait Codec: Send + Sync {
    /// Decode a raw message read from the reset log
    fn decode(&self, raw: &[u8]) -> Result<ControlMessage, CodecError>;

    /// Encode a control message
    fn encode(&self, message: ControlMessage) -> Result<Bytes, CodecError>;

    /// Payload published on the reset-ack log
    fn encode_reset_ack(&self) -> Result<Bytes, CodecError> {
        self.encode(ControlMessage::ResetAck)
    }

    fn encode_reset(&self) -> Result<Bytes, CodecError> {
        self.encode(ControlMessage::Reset)
    }

    fn encode_reset_done(&self) -> Result<Bytes, CodecError> {
        self.encode(ControlMessage::ResetDone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_message_tags() {
        assert_eq!(ControlMessage::Reset.tag(), "reset");
        assert_eq!(ControlMessage::ResetDone.to_string(), "reset_done");
        assert_eq!(ControlMessage::ResetAck.tag(), "reset_ack");
    }

    #[test]
    fn test_control_message_serde_tag() {
        let json = serde_json::to_string(&ControlMessage::ResetDone).unwrap();
        assert_eq!(json, r#"{"type":"reset_done"}"#);

        let parsed: ControlMessage = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(parsed, ControlMessage::Reset);
    }
}

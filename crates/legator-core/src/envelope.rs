use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::probe::{HeartbeatSample, Inventory};

/// Discriminator for the wire envelope, per spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Register,
    Registered,
    Heartbeat,
    Inventory,
    Command,
    CommandResult,
    OutputChunk,
    PolicyUpdate,
    Ping,
    Pong,
    Update,
    Error,
}

/// Envelope carried over the probe WebSocket in both directions.
///
/// `payload` is intentionally `serde_json::Value` rather than a typed enum:
/// the envelope is decoded in two stages (read `type`, then decode the
/// matching payload variant) so that an unrecognized `payload` shape for a
/// known `type` can still be logged with its raw JSON, per spec.md §4.1's
/// "malformed frames are logged and skipped, not fatal".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Envelope {
    #[must_use]
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_type,
            timestamp: Utc::now(),
            payload,
            signature: None,
        }
    }

    /// Decode `payload` as `T`, returning a descriptive error on mismatch
    /// rather than panicking — callers treat this as "malformed frame".
    pub fn decode_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// `register` payload: a probe announcing itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub probe_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub inventory: Option<Inventory>,
}

/// `heartbeat` payload, sent by the probe every 30s per spec.md §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub probe_id: String,
    #[serde(flatten)]
    pub sample: Option<HeartbeatSample>,
}

/// `command` payload dispatched to a probe. `timeout_ns` is integer
/// nanoseconds per spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPayload {
    pub request_id: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout_ns: u64,
    pub capability_level: String,
}

/// `command_result` payload returned by the probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResultPayload {
    pub request_id: String,
    pub exit_code: i32,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub duration_ms: u64,
}

/// `output_chunk` payload for streaming command output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunkPayload {
    pub request_id: String,
    pub chunk: String,
    pub sequence: u64,
}

/// `error` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

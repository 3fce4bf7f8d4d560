//! Wire codec for the Gateway envelope `{ op, d, s, t }`.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::config::ConnectionProperties;
use crate::error::{Error, Kind};

/// Gateway operation codes.
///
/// The numbering has gaps; codes this client never sees or sends are not
/// listed, and frames carrying them decode to [`DecodeError::UnknownOpCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
#[non_exhaustive]
pub enum OpCode {
    /// Server event dispatch, sequenced and named via `s` and `t`
    Dispatch = 0,
    /// Heartbeat, sent by us on schedule or by the server as a demand
    Heartbeat = 1,
    /// Opening handshake for a fresh session
    Identify = 2,
    /// Opening handshake replaying an interrupted session
    Resume = 6,
    /// Server demands we drop the transport and reconnect
    Reconnect = 7,
    /// Server rejected the session; `d` says whether it is resumable
    InvalidSession = 9,
    /// First frame on every connection, carries the heartbeat interval
    Hello = 10,
    /// Server acknowledgement of our last heartbeat
    HeartbeatAck = 11,
}

impl TryFrom<u8> for OpCode {
    type Error = DecodeError;

    fn try_from(raw: u8) -> Result<Self, DecodeError> {
        match raw {
            0 => Ok(Self::Dispatch),
            1 => Ok(Self::Heartbeat),
            2 => Ok(Self::Identify),
            6 => Ok(Self::Resume),
            7 => Ok(Self::Reconnect),
            9 => Ok(Self::InvalidSession),
            10 => Ok(Self::Hello),
            11 => Ok(Self::HeartbeatAck),
            other => Err(DecodeError::UnknownOpCode(other)),
        }
    }
}

/// Raw wire shape. `d`, `s` and `t` are all omitted or null outside dispatches.
#[derive(Debug, Deserialize)]
struct Envelope {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// A decoded Gateway frame.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Frame {
    pub op: OpCode,
    /// Payload, still undecoded; its shape depends on `op` and `event_name`.
    pub data: Value,
    /// Dispatch sequence number, only present when `op` is [`OpCode::Dispatch`].
    pub sequence: Option<u64>,
    /// Dispatch event name, only present when `op` is [`OpCode::Dispatch`].
    pub event_name: Option<String>,
}

impl Frame {
    pub(crate) fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            data: last_sequence.map_or(Value::Null, Value::from),
            sequence: None,
            event_name: None,
        }
    }
}

/// Decode one frame from raw transport bytes.
pub fn decode(bytes: &[u8]) -> Result<Frame, DecodeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    let op = OpCode::try_from(envelope.op)?;

    Ok(Frame {
        op,
        data: envelope.d,
        sequence: envelope.s,
        event_name: envelope.t,
    })
}

/// Encode a frame for the wire. Outbound frames never carry `s` or `t`.
pub fn encode(frame: &Frame) -> Result<String, DecodeError> {
    #[derive(Serialize)]
    struct Outbound<'frame> {
        op: OpCode,
        d: &'frame Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        s: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        t: Option<&'frame str>,
    }

    Ok(serde_json::to_string(&Outbound {
        op: frame.op,
        d: &frame.data,
        s: frame.sequence,
        t: frame.event_name.as_deref(),
    })?)
}

/// Serialize a typed payload into an outbound `{ op, d }` envelope.
pub(crate) fn encode_payload<T: Serialize>(op: OpCode, d: &T) -> Result<String, DecodeError> {
    #[derive(Serialize)]
    struct Outbound<'payload, T> {
        op: OpCode,
        d: &'payload T,
    }

    Ok(serde_json::to_string(&Outbound { op, d })?)
}

/// HELLO payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Hello {
    /// Heartbeat cadence in milliseconds
    pub heartbeat_interval: u64,
}

/// The subset of the READY payload the connection task needs for resumption.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReadyInfo {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

/// IDENTIFY payload.
#[derive(Debug, Serialize)]
pub(crate) struct Identify<'conn> {
    pub token: &'conn str,
    pub properties: &'conn ConnectionProperties,
    pub intents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u64; 2]>,
}

/// RESUME payload.
#[derive(Debug, Serialize)]
pub(crate) struct Resume<'conn> {
    pub token: &'conn str,
    pub session_id: &'conn str,
    pub seq: u64,
}

#[non_exhaustive]
#[derive(Debug)]
pub enum DecodeError {
    /// The frame was not valid JSON or did not match the envelope shape
    Json(serde_json::Error),
    /// The envelope carried an op code this client does not understand
    UnknownOpCode(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed gateway frame: {e}"),
            Self::UnknownOpCode(op) => write!(f, "unknown gateway op code {op}"),
        }
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::UnknownOpCode(_) => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::with_source(Kind::Gateway, e)
    }
}

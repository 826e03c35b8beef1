//! # Domain Entities
//!
//! The signed envelope as it travels on the exchange's WebSocket streams.
//!
//! ```text
//! {"meta": {"ts": <number|string>, "sig": "<base64>", ...},
//!  "data": {"type": "<string>", ...}}
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

// =============================================================================
// Timestamp
// =============================================================================

/// Sender-supplied timestamp, part of the signed material.
///
/// The exchange emits milliseconds as a decimal string; other signers send a
/// bare integer. Both are signed in their decimal text form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Integer timestamp, signed as its decimal literal.
    Numeric(u64),
    /// String timestamp, signed verbatim.
    Text(String),
}

impl Timestamp {
    /// Current wall-clock time in milliseconds, in the exchange's string form.
    ///
    /// A clock before UNIX_EPOCH yields `"0"` rather than panicking.
    pub fn now_millis() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Timestamp::Text(millis.to_string())
    }
}

// Read through `Value`: numbers inside a flattened `Meta` arrive buffered,
// and only `Value` restores them from serde_json's arbitrary-precision form.
impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Timestamp::Text(s)),
            Value::Number(n) => n.as_u64().map(Timestamp::Numeric).ok_or_else(|| {
                de::Error::invalid_value(
                    de::Unexpected::Other(&format!("number {n}")),
                    &"a non-negative integer timestamp",
                )
            }),
            other => Err(de::Error::invalid_type(
                de::Unexpected::Other(&other.to_string()),
                &"an integer or string timestamp",
            )),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Numeric(n) => write!(f, "{}", n),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Timestamp::Numeric(value)
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Timestamp::Text(value.to_string())
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Authentication metadata of an envelope.
///
/// Only `ts` and `sig` take part in verification. `algo` and `key_id` steer
/// it; anything else the sender attaches (throttle counters, exposure
/// snapshots) is kept in `extra` and never signed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub ts: Timestamp,
    pub sig: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meta {
    /// Metadata carrying only the two mandatory fields.
    pub fn new(ts: impl Into<Timestamp>, sig: impl Into<String>) -> Self {
        Self {
            ts: ts.into(),
            sig: sig.into(),
            algo: None,
            key_id: None,
            extra: Map::new(),
        }
    }
}

/// A received message: metadata plus payload.
///
/// `D` is `Value` for the parsed form and `Box<RawValue>` when the payload
/// bytes must be kept exactly as they arrived.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<D = Value> {
    pub meta: Meta,
    pub data: D,
}

/// Envelope whose payload is kept as the sender's exact bytes.
pub type RawEnvelope = Envelope<Box<RawValue>>;

// =============================================================================
// Verified output
// =============================================================================

/// An envelope that passed authentication.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedMessage {
    pub meta: Meta,
    pub data: Value,
}

impl VerifiedMessage {
    /// The payload's `type` discriminator, if it has one.
    pub fn msg_type(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }
}

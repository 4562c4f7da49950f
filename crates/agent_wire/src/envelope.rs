use serde_json::Value;

use crate::error::WireError;
use crate::events::{event_from_parts, event_from_payload, DomainEvent};

/// Result of decoding one connection frame.
///
/// A frame can carry an identity update, conversation events, both, or
/// neither (pure control frames decode to an empty event list).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedFrame {
    /// Durable session id announced on the envelope, when present.
    pub session_id: Option<String>,
    pub events: Vec<DomainEvent>,
}

impl DecodedFrame {
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none() && self.events.is_empty()
    }
}

/// Decode one inbound connection frame.
///
/// Envelope shape: `{type | messageType, sessionId?, data?}`. The nested
/// payload discriminates the event kind; some frame producers inline the
/// payload fields at the top level instead, which is handled by falling back
/// to the envelope discriminant. Malformed frames return a [`WireError`] so
/// the caller can log and drop the single frame without touching the
/// connection.
pub fn decode_frame(raw: &str) -> Result<DecodedFrame, WireError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| WireError::protocol(format!("malformed frame: {error}")))?;

    let kind = value
        .get("type")
        .or_else(|| value.get("messageType"))
        .and_then(Value::as_str)
        .ok_or_else(|| WireError::protocol("frame missing 'type' discriminant"))?;

    let session_id = value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string);

    let mut events = Vec::new();
    match (kind, value.get("data")) {
        // Heartbeat acknowledgment is a transport-level control frame.
        ("pong", _) => events.push(DomainEvent::HeartbeatAck),
        (_, Some(data)) if data.get("type").is_some() => {
            if let Some(event) = event_from_payload(data)? {
                events.push(event);
            }
        }
        (_, Some(data)) => {
            if let Some(event) = event_from_parts(kind, data)? {
                events.push(event);
            }
        }
        (_, None) => {
            if let Some(event) = event_from_parts(kind, &value)? {
                events.push(event);
            }
        }
    }

    Ok(DecodedFrame { session_id, events })
}

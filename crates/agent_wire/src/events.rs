use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WireError;

/// Terminal outcome reported by a `tool_end` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Failed,
}

impl ToolOutcome {
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "success" | "ok" | "completed" => Self::Success,
            "failed" | "error" => Self::Failed,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// One step of a structured multi-step plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Decoded, transport-agnostic unit of conversation progress.
///
/// Every inbound transport produces this same closed set, so the transcript
/// fold has exactly one event shape to match on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ContentDelta {
        text: String,
    },
    ToolStart {
        name: String,
        label: Option<String>,
        agent: Option<String>,
    },
    ToolEnd {
        name: String,
        status: ToolOutcome,
        result: Option<Value>,
    },
    Plan {
        steps: Vec<PlanStep>,
    },
    Error {
        message: String,
    },
    Done,
    PresenceJoin {
        user: String,
    },
    PresenceLeave {
        user: String,
    },
    HeartbeatAck,
}

/// Map a structured payload to a [`DomainEvent`] by its `type` discriminant.
///
/// Returns `Ok(None)` for recognized-shape payloads with an unknown type
/// (dropped silently, so new server event kinds degrade gracefully) and
/// `Err` for payloads that are not discriminated objects at all.
pub fn event_from_payload(payload: &Value) -> Result<Option<DomainEvent>, WireError> {
    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WireError::protocol("payload missing 'type' discriminant"))?;
    event_from_parts(kind, payload)
}

/// Map a payload whose discriminant arrived separately (e.g. on the frame
/// envelope) to a [`DomainEvent`].
pub fn event_from_parts(kind: &str, fields: &Value) -> Result<Option<DomainEvent>, WireError> {
    if !fields.is_object() {
        return Err(WireError::protocol(format!(
            "payload for '{kind}' must be an object"
        )));
    }

    let event = match kind {
        "content_delta" => DomainEvent::ContentDelta {
            text: string_field(fields, &["text", "delta"]).unwrap_or_default(),
        },
        "tool_start" => DomainEvent::ToolStart {
            name: string_field(fields, &["name", "tool"]).ok_or_else(|| {
                WireError::protocol("tool_start payload missing tool name")
            })?,
            label: string_field(fields, &["label"]),
            agent: string_field(fields, &["agent", "agentName"]),
        },
        "tool_end" => DomainEvent::ToolEnd {
            name: string_field(fields, &["name", "tool"]).ok_or_else(|| {
                WireError::protocol("tool_end payload missing tool name")
            })?,
            // Absent or unrecognized statuses count as success; only an
            // explicit failure marks the entry failed.
            status: string_field(fields, &["status"])
                .as_deref()
                .and_then(ToolOutcome::parse)
                .unwrap_or(ToolOutcome::Success),
            result: fields.get("result").filter(|value| !value.is_null()).cloned(),
        },
        "plan" => DomainEvent::Plan {
            steps: plan_steps(fields.get("steps")),
        },
        "error" => DomainEvent::Error {
            message: string_field(fields, &["message", "error"])
                .unwrap_or_else(|| "unknown error".to_owned()),
        },
        "done" => DomainEvent::Done,
        "presence_join" => DomainEvent::PresenceJoin {
            user: string_field(fields, &["user", "userId", "name"]).unwrap_or_default(),
        },
        "presence_leave" => DomainEvent::PresenceLeave {
            user: string_field(fields, &["user", "userId", "name"]).unwrap_or_default(),
        },
        "pong" => DomainEvent::HeartbeatAck,
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn string_field(fields: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| fields.get(*name))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn plan_steps(steps: Option<&Value>) -> Vec<PlanStep> {
    let Some(Value::Array(items)) = steps else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(title) => Some(PlanStep {
                title: title.clone(),
                completed: false,
            }),
            Value::Object(_) => Some(PlanStep {
                title: string_field(item, &["title", "text", "step"])?,
                completed: item
                    .get("completed")
                    .or_else(|| item.get("done"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{event_from_payload, DomainEvent, ToolOutcome};

    #[test]
    fn tool_end_defaults_to_success_without_status() {
        let event = event_from_payload(&json!({"type": "tool_end", "name": "bash"}))
            .expect("tool_end payload should decode")
            .expect("tool_end should map to an event");

        assert!(matches!(
            event,
            DomainEvent::ToolEnd {
                status: ToolOutcome::Success,
                ..
            }
        ));
    }

    #[test]
    fn unknown_payload_type_is_dropped_not_an_error() {
        let mapped = event_from_payload(&json!({"type": "typing_indicator"}))
            .expect("recognized-shape payload should not error");
        assert!(mapped.is_none());
    }

    #[test]
    fn plan_steps_accept_strings_and_objects() {
        let event = event_from_payload(&json!({
            "type": "plan",
            "steps": ["read files", {"title": "write tests", "completed": true}, 42],
        }))
        .expect("plan payload should decode")
        .expect("plan should map to an event");

        let DomainEvent::Plan { steps } = event else {
            panic!("expected plan event");
        };
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].title, "read files");
        assert!(!steps[0].completed);
        assert!(steps[1].completed);
    }
}

use agent_wire::{DomainEvent, PlanStep, ToolOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Lifecycle status of a tool transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Success,
    Failed,
}

impl From<ToolOutcome> for ToolStatus {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success => Self::Success,
            ToolOutcome::Failed => Self::Failed,
        }
    }
}

/// One visible turn, message, or tool call in the reconstructed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    User {
        text: String,
    },
    Assistant {
        text: String,
        #[serde(default)]
        streaming: bool,
    },
    Tool {
        name: String,
        status: ToolStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    Plan {
        steps: Vec<PlanStep>,
    },
    Error {
        message: String,
    },
}

impl TranscriptEntry {
    /// True for an entry still being appended to.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Assistant { streaming: true, .. })
    }
}

/// Ordered transcript of one conversation.
///
/// The fold is the single writer: entry order equals event arrival order on
/// the delivering transport, and at most one entry is streaming at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Rebuilds a transcript from persisted entries.
    #[must_use]
    pub fn from_entries(entries: Vec<TranscriptEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a user turn.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(TranscriptEntry::User { text: text.into() });
    }

    /// Folds one domain event into the transcript, in arrival order.
    pub fn apply(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::ContentDelta { text } => match self.open_assistant_mut() {
                Some(open) => open.push_str(text),
                None => self.entries.push(TranscriptEntry::Assistant {
                    text: text.clone(),
                    streaming: true,
                }),
            },
            DomainEvent::ToolStart { name, .. } => {
                self.entries.push(TranscriptEntry::Tool {
                    name: name.clone(),
                    status: ToolStatus::Running,
                    result: None,
                });
            }
            DomainEvent::ToolEnd {
                name,
                status,
                result,
            } => self.settle_tool(name, (*status).into(), result.clone()),
            DomainEvent::Plan { steps } => {
                self.entries.push(TranscriptEntry::Plan {
                    steps: steps.clone(),
                });
            }
            DomainEvent::Error { message } => {
                self.close_streaming();
                self.entries.push(TranscriptEntry::Error {
                    message: message.clone(),
                });
            }
            DomainEvent::Done => self.close_streaming(),
            // Liveness and presence traffic has no transcript effect.
            DomainEvent::HeartbeatAck
            | DomainEvent::PresenceJoin { .. }
            | DomainEvent::PresenceLeave { .. } => {}
        }
    }

    /// Freezes the open streaming entry, if any.
    pub fn close_streaming(&mut self) {
        for entry in self.entries.iter_mut().rev() {
            if let TranscriptEntry::Assistant { streaming, .. } = entry {
                if *streaming {
                    *streaming = false;
                    return;
                }
            }
        }
    }

    /// Drops everything but the most recent `keep` entries.
    pub fn truncate_to_recent(&mut self, keep: usize) {
        let len = self.entries.len();
        if len > keep {
            self.entries.drain(0..len - keep);
        }
    }

    fn open_assistant_mut(&mut self) -> Option<&mut String> {
        self.entries.iter_mut().rev().find_map(|entry| match entry {
            TranscriptEntry::Assistant {
                text,
                streaming: true,
            } => Some(text),
            _ => None,
        })
    }

    /// Marks the nearest preceding running tool entry with a matching name.
    ///
    /// The reverse scan matters when multiple same-named tools run
    /// concurrently: the innermost (most recent) running entry settles first.
    fn settle_tool(&mut self, name: &str, status: ToolStatus, result: Option<Value>) {
        let settled = self.entries.iter_mut().rev().find_map(|entry| match entry {
            TranscriptEntry::Tool {
                name: entry_name,
                status: entry_status,
                result: entry_result,
            } if entry_name == name && *entry_status == ToolStatus::Running => {
                *entry_status = status;
                *entry_result = result.clone();
                Some(())
            }
            _ => None,
        });

        if settled.is_none() {
            debug!(tool = name, "tool_end without a running tool entry; dropped");
        }
    }
}

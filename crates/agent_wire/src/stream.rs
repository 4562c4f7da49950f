use serde_json::Value;
use tracing::warn;

use crate::events::{event_from_payload, DomainEvent};

/// Line prefix carrying the payload inside one stream record.
pub const STREAM_DATA_PREFIX: &str = "data:";

/// Record delimiter: a blank-line terminator.
const RECORD_DELIMITER: &str = "\n\n";

/// Incremental reconstructor for a chunked one-way response stream.
///
/// Bytes are accumulated until a record delimiter completes a frame; the
/// payload line is stripped of its prefix and parsed as structured data. The
/// framing is independent of how the transport chunked the bytes: one byte
/// per feed and one megabyte per feed produce the same event sequence.
#[derive(Debug, Default)]
pub struct StreamReconstructor {
    buffer: String,
    saw_done: bool,
}

impl StreamReconstructor {
    /// Feed arbitrary bytes into the reconstructor and drain complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DomainEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find(RECORD_DELIMITER) {
            let record = self.buffer[..split].to_string();
            self.buffer.drain(0..split + RECORD_DELIMITER.len());

            let Some(payload) = extract_data_payload(&record) else {
                continue;
            };
            if payload.is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<Value>(&payload)
                .map_err(|error| error.to_string())
                .and_then(|value| event_from_payload(&value).map_err(|error| error.to_string()));
            match parsed {
                Ok(Some(event)) => {
                    if matches!(event, DomainEvent::Done) {
                        self.saw_done = true;
                    }
                    events.push(event);
                }
                Ok(None) => {}
                Err(error) => {
                    // One bad record never aborts the stream.
                    warn!(%error, "dropping malformed stream record");
                }
            }
        }

        events
    }

    /// Reconstruct a complete stream payload in one shot.
    pub fn parse_records(input: &str) -> Vec<DomainEvent> {
        let mut reconstructor = Self::default();
        reconstructor.feed(input.as_bytes())
    }

    /// Finish consumption after the underlying response signals completion.
    ///
    /// Any partial buffered record is discarded, never parsed. Returns a
    /// synthesized [`DomainEvent::Done`] when the stream ended without one, so
    /// callers always observe a terminal event.
    pub fn finish(self) -> Option<DomainEvent> {
        if self.saw_done {
            None
        } else {
            Some(DomainEvent::Done)
        }
    }

    pub fn has_partial_record(&self) -> bool {
        !self.buffer.trim().is_empty()
    }
}

fn extract_data_payload(record: &str) -> Option<String> {
    let data_lines: Vec<&str> = record
        .lines()
        .filter_map(|line| line.strip_prefix(STREAM_DATA_PREFIX))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

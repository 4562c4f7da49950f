//! Transport-agnostic wire layer for agent conversation events.
//!
//! This crate owns the closed set of conversation [`DomainEvent`]s and the two
//! decoders that produce them: the connection-frame envelope decoder and the
//! chunked-stream reconstructor. Both map inbound payloads through one shared
//! schema, so event folding downstream is written once against a single event
//! shape regardless of which transport delivered the bytes.
//!
//! No I/O happens here; callers feed raw frame text or byte chunks in and get
//! typed events out.

pub mod envelope;
pub mod error;
pub mod events;
pub mod stream;

pub use envelope::{decode_frame, DecodedFrame};
pub use error::WireError;
pub use events::{event_from_payload, DomainEvent, PlanStep, ToolOutcome};
pub use stream::StreamReconstructor;

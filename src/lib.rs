//! Client-side conversation layer for a coding agent service.
//!
//! The workspace splits along transport seams:
//!
//! - [`agent_wire`] — the closed domain event set, the connection-frame
//!   envelope decoder, and the chunked-stream reconstructor; pure, no I/O.
//! - [`agent_socket`] — the managed bidirectional connection: explicit state
//!   machine, heartbeat, capped exponential backoff, outbound queueing.
//! - [`transcript_store`] — the event fold into an ordered transcript and its
//!   debounced, quota-aware persistence across storage tiers.
//!
//! This crate ties them together in [`ConversationController`]: one live
//! conversation whose turns travel either over the socket or over a chunked
//! HTTP stream, with every inbound event folded into the same transcript.

pub mod controller;
pub mod error;
pub mod turn;

pub use controller::{ControllerConfig, ConversationController};
pub use error::ControllerError;
pub use turn::{drive_stream, StreamTurnParams};

pub use agent_socket::{BackoffPolicy, ConnectionState, SocketConfig, SocketEvent};
pub use agent_wire::{DomainEvent, StreamReconstructor};
pub use transcript_store::{SessionIdentity, Transcript, TranscriptEntry, TranscriptStore};

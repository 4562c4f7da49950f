//! Persistent bidirectional connection management.
//!
//! One [`SocketManager`] owns one logical connection and masks transient
//! network failures from callers: it reconnects with capped exponential
//! backoff, queues outbound messages while disconnected and flushes them in
//! order, probes liveness with a heartbeat, and shuts down cleanly without
//! triggering a reconnect.
//!
//! The manager is an explicit state machine (see [`ConnectionState`]) driven
//! over a [`Transport`] seam, so reconnect and timeout behavior is exercised
//! in tests with a fake transport and a paused clock rather than a real
//! network and wall-clock delays.

pub mod backoff;
pub mod config;
pub mod error;
pub mod manager;
pub mod state;
pub mod transport;
pub mod url;

pub use backoff::BackoffPolicy;
pub use config::SocketConfig;
pub use error::SocketError;
pub use manager::{SocketEvent, SocketHandle, SocketManager};
pub use state::ConnectionState;
pub use transport::{
    Connection, OutboundFrame, Transport, TransportEvent, WsTransport, CLEAN_CLOSE_CODE,
};
pub use url::socket_url;

use std::path::PathBuf;
use std::time::Instant;

use agent_socket::{
    ConnectionState, SocketConfig, SocketEvent, SocketHandle, SocketManager, Transport,
    WsTransport,
};
use agent_wire::DomainEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;
use transcript_store::{DurableDirStore, SessionIdentity, Transcript, TranscriptStore};

use crate::error::ControllerError;
use crate::turn::{drive_stream, StreamTurnParams};

/// Configuration for one conversation.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub socket: SocketConfig,
    /// HTTP endpoint serving chunked stream turns.
    pub stream_endpoint: String,
    pub identity: SessionIdentity,
    /// Directory backing the durable snapshot tier.
    pub store_dir: PathBuf,
    /// Byte budget for the durable tier, unbounded when absent.
    pub quota_bytes: Option<u64>,
}

impl ControllerConfig {
    pub fn new(
        socket: SocketConfig,
        stream_endpoint: impl Into<String>,
        identity: SessionIdentity,
        store_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            socket,
            stream_endpoint: stream_endpoint.into(),
            identity,
            store_dir: store_dir.into(),
            quota_bytes: None,
        }
    }

    #[must_use]
    pub fn with_quota_bytes(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }
}

/// Owns one live conversation: the persisted transcript, the managed socket,
/// and the chunked stream turn driver.
///
/// The two turn transports are mutually exclusive per turn: a send over the
/// socket is rejected while a stream turn is in flight.
pub struct ConversationController {
    store: TranscriptStore,
    socket: SocketHandle,
    socket_events: mpsc::UnboundedReceiver<SocketEvent>,
    http: reqwest::Client,
    stream_endpoint: String,
    connection_state: ConnectionState,
    stream_turn_active: bool,
}

impl ConversationController {
    /// Opens the conversation over the real websocket transport.
    ///
    /// Must run inside a tokio runtime; the socket manager is spawned here.
    pub fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        Self::with_transport(config, WsTransport)
    }

    /// Opens the conversation over a caller-supplied transport.
    pub fn with_transport<T: Transport>(
        config: ControllerConfig,
        transport: T,
    ) -> Result<Self, ControllerError> {
        let mut tier = DurableDirStore::new(&config.store_dir)?;
        if let Some(quota) = config.quota_bytes {
            tier = tier.with_quota(quota);
        }

        let mut store = TranscriptStore::new(config.identity, Box::new(tier));
        if store.load()? {
            debug!(
                session_id = store.identity().durable_id(),
                entries = store.transcript().len(),
                "restored existing transcript"
            );
        }

        let (socket, socket_events) = SocketManager::spawn(config.socket, transport);

        Ok(Self {
            store,
            socket,
            socket_events,
            http: reqwest::Client::new(),
            stream_endpoint: config.stream_endpoint,
            connection_state: ConnectionState::Connecting,
            stream_turn_active: false,
        })
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        self.store.transcript()
    }

    #[must_use]
    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Last connection state observed by [`Self::pump_socket`].
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Epoch-millis of the last heartbeat acknowledgment, if any.
    #[must_use]
    pub fn last_heartbeat_ack(&self) -> Option<u64> {
        self.socket.last_heartbeat_ack()
    }

    /// Records a user turn and sends it over the managed socket.
    ///
    /// Never fails for transient disconnection; the socket manager queues and
    /// flushes on reconnect.
    pub fn send_turn(&mut self, text: &str) -> Result<(), ControllerError> {
        if self.stream_turn_active {
            return Err(ControllerError::TurnInProgress);
        }

        self.store.push_user(text, Instant::now());
        let envelope = serde_json::json!({
            "type": "message",
            "text": text,
            "sessionId": self.store.identity().durable_id(),
        });
        self.socket.send(envelope.to_string());
        Ok(())
    }

    /// Runs one turn over the chunked HTTP stream endpoint.
    pub async fn stream_turn(&mut self, params: StreamTurnParams) -> Result<(), ControllerError> {
        if self.stream_turn_active {
            return Err(ControllerError::TurnInProgress);
        }

        self.store.push_user(params.message.clone(), Instant::now());
        self.stream_turn_active = true;
        let outcome = self.run_stream_turn(&params).await;
        self.stream_turn_active = false;
        outcome
    }

    async fn run_stream_turn(&mut self, params: &StreamTurnParams) -> Result<(), ControllerError> {
        let response = self
            .http
            .get(&self.stream_endpoint)
            .query(&params.query())
            .send()
            .await?
            .error_for_status()?;
        drive_stream(&mut self.store, response.bytes_stream()).await
    }

    /// Runs one turn from an already-open chunk source, bypassing HTTP.
    pub async fn stream_turn_from_chunks<S, B, E>(
        &mut self,
        message: &str,
        chunks: S,
    ) -> Result<(), ControllerError>
    where
        S: futures_util::Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        if self.stream_turn_active {
            return Err(ControllerError::TurnInProgress);
        }

        self.store.push_user(message, Instant::now());
        self.stream_turn_active = true;
        let outcome = drive_stream(&mut self.store, chunks).await;
        self.stream_turn_active = false;
        outcome
    }

    /// Drains pending socket events into the transcript fold.
    ///
    /// Envelope session ids update the store identity in place; terminal
    /// connection failures are recorded as transcript error entries.
    pub fn pump_socket(&mut self, now: Instant) -> Result<(), ControllerError> {
        loop {
            let event = match self.socket_events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return Ok(()),
            };

            match event {
                SocketEvent::State(state) => {
                    self.connection_state = state;
                    if state.is_failure() {
                        let event = DomainEvent::Error {
                            message: format!("connection {}", state.as_str()),
                        };
                        self.store.apply(&event, now);
                    }
                }
                SocketEvent::Frame(frame) => {
                    if let Some(session_id) = &frame.session_id {
                        self.store.set_durable_id(session_id)?;
                    }
                    for event in &frame.events {
                        self.store.apply(event, now);
                    }
                }
            }
        }
    }

    /// Fires the debounced persistence write if its quiet period elapsed.
    pub fn flush_due(&mut self, now: Instant) -> Result<bool, ControllerError> {
        Ok(self.store.flush_if_due(now)?)
    }

    /// Deadline of the pending debounced write, for the host's timer.
    #[must_use]
    pub fn next_flush(&self) -> Option<Instant> {
        self.store.flush_deadline()
    }

    /// Clean shutdown: closes the socket without reconnect and persists the
    /// transcript immediately.
    pub fn shutdown(&mut self) -> Result<(), ControllerError> {
        self.socket.shutdown();
        self.store.flush_now()?;
        Ok(())
    }
}

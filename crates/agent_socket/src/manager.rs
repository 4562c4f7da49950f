use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use agent_wire::{decode_frame, DecodedFrame, DomainEvent};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::state::ConnectionState;
use crate::transport::{Connection, OutboundFrame, Transport, TransportEvent, CLEAN_CLOSE_CODE};
use crate::url::socket_url;

/// Notification delivered to the manager's owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    State(ConnectionState),
    /// Decoded conversation frame; heartbeat acks are consumed internally
    /// and never appear here.
    Frame(DecodedFrame),
}

#[derive(Debug)]
enum Command {
    Send(String),
    Shutdown,
}

/// Caller-side handle to a spawned [`SocketManager`].
#[derive(Debug, Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<Command>,
    last_ack: Arc<AtomicU64>,
}

impl SocketHandle {
    /// Transmits now or queues for the next flush; never fails for
    /// transient disconnection.
    pub fn send(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::Send(text.into()));
    }

    /// Requests a clean shutdown: timers cancelled, transport closed with
    /// the clean code, no reconnect.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Epoch-millis of the last heartbeat acknowledgment, if any.
    ///
    /// Observers use this to detect silent connection death even when the
    /// transport has not reported a close.
    #[must_use]
    pub fn last_heartbeat_ack(&self) -> Option<u64> {
        match self.last_ack.load(Ordering::Acquire) {
            0 => None,
            millis => Some(millis),
        }
    }

    /// False once the manager task has reached a terminal state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Owns exactly one logical connection, masking transient network failures
/// from callers behind reconnect-with-backoff.
pub struct SocketManager;

impl SocketManager {
    /// Spawns the manager task over the given transport.
    pub fn spawn<T: Transport>(
        config: SocketConfig,
        transport: T,
    ) -> (SocketHandle, mpsc::UnboundedReceiver<SocketEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let last_ack = Arc::new(AtomicU64::new(0));

        tokio::spawn(run(
            config,
            transport,
            command_rx,
            event_tx,
            Arc::clone(&last_ack),
        ));

        (
            SocketHandle {
                commands: command_tx,
                last_ack,
            },
            event_rx,
        )
    }
}

/// Why a connected session ended.
enum Session {
    /// Transport loss; follow the reconnect path.
    Lost,
    /// Clean close observed; do not reconnect.
    Clean,
    /// Local shutdown request.
    Shutdown,
}

async fn run<T: Transport>(
    config: SocketConfig,
    mut transport: T,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SocketEvent>,
    last_ack: Arc<AtomicU64>,
) {
    let url = match socket_url(&config) {
        Ok(url) => url,
        Err(SocketError::MissingToken) => {
            emit_state(&events, ConnectionState::AuthFailed);
            return;
        }
        Err(error) => {
            warn!(%error, "cannot derive socket url");
            emit_state(&events, ConnectionState::Closed);
            return;
        }
    };

    let mut queue: VecDeque<String> = VecDeque::new();
    let mut attempts: u32 = 0;
    emit_state(&events, ConnectionState::Connecting);

    loop {
        match open_attempt(&config, &mut transport, &url, &mut commands, &mut queue).await {
            OpenOutcome::Connected(conn) => {
                // A successful open resets the attempt counter.
                attempts = 0;
                let session = drive_connection(
                    &config, conn, &mut commands, &events, &mut queue, &last_ack,
                )
                .await;
                match session {
                    Session::Lost => emit_state(&events, ConnectionState::Disconnected),
                    Session::Clean | Session::Shutdown => {
                        emit_state(&events, ConnectionState::Closed);
                        return;
                    }
                }
            }
            OpenOutcome::Failed(error) => {
                warn!(%error, "socket open failed");
                emit_state(&events, ConnectionState::Disconnected);
            }
            OpenOutcome::TimedOut => {
                // An open that never confirms counts as a failed attempt.
                warn!("socket open timed out");
                emit_state(&events, ConnectionState::TimedOut);
            }
            OpenOutcome::Shutdown => {
                emit_state(&events, ConnectionState::Closed);
                return;
            }
        }

        attempts += 1;
        if attempts > config.max_attempts {
            emit_state(&events, ConnectionState::MaxAttemptsReached);
            return;
        }

        let delay = config.backoff.delay(attempts);
        debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        emit_state(&events, ConnectionState::Reconnecting);
        if !wait_backoff(delay, &mut commands, &mut queue, config.queue_cap).await {
            emit_state(&events, ConnectionState::Closed);
            return;
        }
    }
}

/// Outcome of one open attempt.
enum OpenOutcome {
    Connected(Connection),
    Failed(SocketError),
    TimedOut,
    Shutdown,
}

/// Runs one bounded connect attempt while still servicing the command
/// channel, so a shutdown aborts an in-flight open instead of waiting out
/// the open timeout. Sends arriving meanwhile are queued.
async fn open_attempt<T: Transport>(
    config: &SocketConfig,
    transport: &mut T,
    url: &str,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    queue: &mut VecDeque<String>,
) -> OpenOutcome {
    let connect = timeout(config.open_timeout, transport.connect(url));
    tokio::pin!(connect);

    loop {
        tokio::select! {
            outcome = &mut connect => {
                return match outcome {
                    Ok(Ok(conn)) => OpenOutcome::Connected(conn),
                    Ok(Err(error)) => OpenOutcome::Failed(error),
                    Err(_elapsed) => OpenOutcome::TimedOut,
                };
            }
            command = commands.recv() => match command {
                Some(Command::Send(text)) => enqueue(queue, text, config.queue_cap),
                Some(Command::Shutdown) | None => return OpenOutcome::Shutdown,
            },
        }
    }
}

async fn drive_connection(
    config: &SocketConfig,
    mut conn: Connection,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<SocketEvent>,
    queue: &mut VecDeque<String>,
    last_ack: &AtomicU64,
) -> Session {
    emit_state(events, ConnectionState::Connected);

    // Flush messages queued while disconnected, in FIFO order.
    while let Some(text) = queue.pop_front() {
        if let Err(mpsc::error::SendError(frame)) = conn.outbound.send(OutboundFrame::Text(text)) {
            if let OutboundFrame::Text(text) = frame {
                queue.push_front(text);
            }
            return Session::Lost;
        }
    }

    let mut heartbeat = interval(config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The interval's first tick completes immediately; consume it so probes
    // start one full interval after connect.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if conn.outbound.send(OutboundFrame::Text(text.clone())).is_err() {
                        enqueue(queue, text, config.queue_cap);
                        return Session::Lost;
                    }
                }
                Some(Command::Shutdown) | None => {
                    let _ = conn.outbound.send(OutboundFrame::Close(CLEAN_CLOSE_CODE));
                    return Session::Shutdown;
                }
            },
            _ = heartbeat.tick() => {
                if conn.outbound.send(OutboundFrame::Text(ping_frame())).is_err() {
                    return Session::Lost;
                }
            }
            inbound = conn.inbound.recv() => match inbound {
                Some(TransportEvent::Text(text)) => handle_frame(&text, events, last_ack),
                Some(TransportEvent::Closed { code: Some(CLEAN_CLOSE_CODE) }) => {
                    return Session::Clean;
                }
                Some(TransportEvent::Closed { code }) => {
                    debug!(?code, "socket closed");
                    return Session::Lost;
                }
                Some(TransportEvent::Failed(error)) => {
                    warn!(%error, "socket failed");
                    return Session::Lost;
                }
                None => return Session::Lost,
            },
        }
    }
}

/// Waits out a backoff delay while still accepting sends (queued) and
/// shutdown (returns false).
async fn wait_backoff(
    delay: std::time::Duration,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    queue: &mut VecDeque<String>,
    queue_cap: usize,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(Command::Send(text)) => enqueue(queue, text, queue_cap),
                Some(Command::Shutdown) | None => return false,
            },
        }
    }
}

fn handle_frame(raw: &str, events: &mpsc::UnboundedSender<SocketEvent>, last_ack: &AtomicU64) {
    let mut frame = match decode_frame(raw) {
        Ok(frame) => frame,
        Err(error) => {
            // One bad frame never aborts the connection.
            warn!(%error, "dropping undecodable frame");
            return;
        }
    };

    let had_events = frame.events.len();
    frame
        .events
        .retain(|event| !matches!(event, DomainEvent::HeartbeatAck));
    if frame.events.len() < had_events {
        last_ack.store(epoch_millis(), Ordering::Release);
    }

    if !frame.is_empty() {
        let _ = events.send(SocketEvent::Frame(frame));
    }
}

fn enqueue(queue: &mut VecDeque<String>, text: String, cap: usize) {
    if queue.len() >= cap {
        queue.pop_front();
        warn!("outbound queue full; dropping oldest queued message");
    }
    queue.push_back(text);
}

fn emit_state(events: &mpsc::UnboundedSender<SocketEvent>, state: ConnectionState) {
    let _ = events.send(SocketEvent::State(state));
}

fn ping_frame() -> String {
    serde_json::json!({"type": "ping", "timestamp": epoch_millis()}).to_string()
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

use std::collections::VecDeque;

use agent_socket::{Connection, OutboundFrame, SocketError, Transport, TransportEvent};
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

/// Scripted outcome for one `connect` call.
#[derive(Debug, Clone, Copy)]
pub enum ConnectPlan {
    /// Hand the manager a live connection and expose its peer end.
    Open,
    /// Refuse immediately.
    Refuse,
    /// Never resolve, forcing the open timeout.
    Hang,
}

/// Far end of a fake connection, driven by the test.
pub struct FakePeer {
    pub from_manager: mpsc::UnboundedReceiver<OutboundFrame>,
    pub to_manager: mpsc::UnboundedSender<TransportEvent>,
}

impl FakePeer {
    pub async fn next_frame(&mut self) -> OutboundFrame {
        self.from_manager
            .recv()
            .await
            .expect("manager should keep its outbound side open")
    }

    pub fn push_text(&self, text: &str) {
        self.to_manager
            .send(TransportEvent::Text(text.to_string()))
            .expect("manager should keep its inbound side open");
    }

    pub fn push_close(&self, code: Option<u16>) {
        let _ = self.to_manager.send(TransportEvent::Closed { code });
    }
}

/// Transport whose `connect` calls follow a fixed script. Calls past the end
/// of the script hang, so a test that expects no further connects never sees
/// one succeed.
pub struct FakeTransport {
    plan: VecDeque<ConnectPlan>,
    peers: mpsc::UnboundedSender<FakePeer>,
}

impl FakeTransport {
    pub fn scripted(
        plan: impl IntoIterator<Item = ConnectPlan>,
    ) -> (Self, mpsc::UnboundedReceiver<FakePeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (
            Self {
                plan: plan.into_iter().collect(),
                peers: peers_tx,
            },
            peers_rx,
        )
    }
}

impl Transport for FakeTransport {
    fn connect(&mut self, _url: &str) -> BoxFuture<'static, Result<Connection, SocketError>> {
        let step = self.plan.pop_front().unwrap_or(ConnectPlan::Hang);
        let peers = self.peers.clone();
        Box::pin(async move {
            match step {
                ConnectPlan::Open => {
                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
                    let _ = peers.send(FakePeer {
                        from_manager: outbound_rx,
                        to_manager: inbound_tx,
                    });
                    Ok(Connection {
                        outbound: outbound_tx,
                        inbound: inbound_rx,
                    })
                }
                ConnectPlan::Refuse => {
                    Err(SocketError::Transport("connection refused".to_string()))
                }
                ConnectPlan::Hang => std::future::pending().await,
            }
        })
    }
}

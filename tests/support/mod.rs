use agent_socket::{Connection, OutboundFrame, SocketError, Transport, TransportEvent};
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

/// Far end of a fake socket connection, driven by the test.
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
}

/// Transport whose every `connect` succeeds against a channel-backed peer.
pub struct FakeTransport {
    peers: mpsc::UnboundedSender<FakePeer>,
}

impl FakeTransport {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FakePeer>) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        (Self { peers: peers_tx }, peers_rx)
    }
}

impl Transport for FakeTransport {
    fn connect(&mut self, _url: &str) -> BoxFuture<'static, Result<Connection, SocketError>> {
        let peers = self.peers.clone();
        Box::pin(async move {
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
        })
    }
}

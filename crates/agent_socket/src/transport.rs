use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SocketError;

/// Close code used for locally requested shutdown, distinguishable from
/// abnormal closure so the close path never schedules a reconnect.
pub const CLEAN_CLOSE_CODE: u16 = 1000;

/// Frame handed to the transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the transport with the given code; no frames follow.
    Close(u16),
}

/// Inbound transport notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Closed { code: Option<u16> },
    Failed(String),
}

/// One live connection: an outbound frame sink and an inbound event source.
///
/// Channel-backed so the manager can select over commands, timers, and
/// inbound traffic without splitting the underlying stream. A dropped or
/// exhausted inbound side means the connection is gone.
#[derive(Debug)]
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Connection factory seam between the manager and the network.
pub trait Transport: Send + 'static {
    fn connect(&mut self, url: &str) -> BoxFuture<'static, Result<Connection, SocketError>>;
}

/// Real websocket transport.
///
/// `connect` spawns a writer and a reader pump bridging the tungstenite
/// stream onto the [`Connection`] channels.
#[derive(Debug, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn connect(&mut self, url: &str) -> BoxFuture<'static, Result<Connection, SocketError>> {
        let url = url.to_string();
        Box::pin(async move {
            let (stream, _response) = connect_async(&url)
                .await
                .map_err(|error| SocketError::Transport(error.to_string()))?;
            let (mut sink, mut source) = stream.split();
            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<TransportEvent>();

            tokio::spawn(async move {
                while let Some(frame) = outbound_rx.recv().await {
                    match frame {
                        OutboundFrame::Text(text) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        OutboundFrame::Close(code) => {
                            let _ = sink
                                .send(Message::Close(Some(CloseFrame {
                                    code: CloseCode::from(code),
                                    reason: "".into(),
                                })))
                                .await;
                            break;
                        }
                    }
                }
            });

            tokio::spawn(async move {
                while let Some(message) = source.next().await {
                    let event = match message {
                        Ok(Message::Text(text)) => TransportEvent::Text(text),
                        Ok(Message::Close(frame)) => {
                            let code = frame.map(|frame| u16::from(frame.code));
                            let _ = inbound_tx.send(TransportEvent::Closed { code });
                            break;
                        }
                        // Control and binary frames are handled by the
                        // protocol layer underneath.
                        Ok(_) => continue,
                        Err(error) => {
                            let _ = inbound_tx.send(TransportEvent::Failed(error.to_string()));
                            break;
                        }
                    };
                    if inbound_tx.send(event).is_err() {
                        break;
                    }
                }
            });

            Ok(Connection {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }
}

//! WebSocket implementation of [`Connector`] on top of `tokio-tungstenite`.
//!
//! Each socket is driven by one background task that performs the
//! handshake, pumps queued outbound messages into the sink and forwards
//! inbound messages as [`SocketEvent`]s. Dropping the [`WsSocket`] handle
//! closes the connection.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use super::{CloseInfo, Connector, ReadyState, SharedReadyState, Socket, SocketEvent};
use crate::error::RuttyError;
use crate::protocol::WireMessage;

/// Close code used when the connection ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

enum Outgoing {
    Message(WireMessage),
    Close,
}

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    type Socket = WsSocket;

    fn connect(&self, endpoint: &Url) -> (WsSocket, mpsc::UnboundedReceiver<SocketEvent>) {
        let state = SharedReadyState::new(ReadyState::Connecting);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive(endpoint.clone(), state.clone(), out_rx, event_tx));

        (WsSocket { state, tx: out_tx }, event_rx)
    }
}

/// Handle to a socket opened by [`WsConnector`].
#[derive(Debug)]
pub struct WsSocket {
    state: SharedReadyState,
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Socket for WsSocket {
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, message: WireMessage) -> Result<(), RuttyError> {
        match self.state.get() {
            ReadyState::Open => Ok(self.tx.send(Outgoing::Message(message))?),
            other => Err(RuttyError::NotOpen(other)),
        }
    }

    fn close(&self) {
        if matches!(self.state.get(), ReadyState::Connecting | ReadyState::Open) {
            self.state.set(ReadyState::Closing);
            let _ = self.tx.send(Outgoing::Close);
        }
    }
}

fn to_tungstenite(message: WireMessage) -> Message {
    match message {
        WireMessage::Text(text) => Message::Text(text.into()),
        WireMessage::Binary(data) => Message::Binary(data),
    }
}

async fn drive(
    endpoint: Url,
    state: SharedReadyState,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    debug!("connecting to {endpoint}");
    let stream = match tokio_tungstenite::connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!("failed to connect to {endpoint}: {e}");
            state.set(ReadyState::Closed);
            let _ = events.send(SocketEvent::Close(CloseInfo::new(
                Some(ABNORMAL_CLOSURE),
                e.to_string(),
            )));
            return;
        }
    };

    // A close requested during the handshake wins over the open.
    let mut closing = state.get() == ReadyState::Closing;
    if !closing {
        state.set(ReadyState::Open);
        info!("connected to {endpoint}");
        let _ = events.send(SocketEvent::Open);
    }

    let (mut sink, mut stream) = stream.split();
    if closing {
        let _ = sink.send(Message::Close(None)).await;
    }

    let mut close = CloseInfo::new(Some(ABNORMAL_CLOSURE), "");
    loop {
        tokio::select! {
            out = outgoing.recv(), if !closing => match out {
                Some(Outgoing::Message(message)) => {
                    if let Err(e) = sink.send(to_tungstenite(message)).await {
                        warn!("failed to write to socket: {e}");
                        close.reason = e.to_string();
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    closing = true;
                    state.set(ReadyState::Closing);
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!("close frame not sent: {e}");
                        break;
                    }
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Message(WireMessage::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(SocketEvent::Message(WireMessage::Binary(data)));
                }
                Some(Ok(Message::Close(frame))) => {
                    close = match frame {
                        Some(frame) => CloseInfo::new(Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => CloseInfo::new(None, ""),
                    };
                    state.set(ReadyState::Closing);
                    // Flush the close reply queued by tungstenite.
                    let _ = sink.flush().await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("socket read error: {e}");
                    close.reason = e.to_string();
                    break;
                }
                None => break,
            },
        }
    }

    state.set(ReadyState::Closed);
    info!(code = ?close.code, reason = %close.reason, "disconnected from {endpoint}");
    let _ = events.send(SocketEvent::Close(close));
}

//! Socket abstraction used by the transport.
//!
//! A [`Connector`] creates a [`Socket`] immediately, in the `Connecting`
//! state, together with a channel of [`SocketEvent`]s that reports when it
//! opens, every inbound message, and its eventual close. This mirrors how
//! a browser WebSocket behaves and lets tests substitute a scripted socket.

pub mod websocket;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;
use url::Url;

use crate::error::RuttyError;
use crate::protocol::WireMessage;

pub use websocket::{WsConnector, WsSocket};

// ── ReadyState ───────────────────────────────────────────────────

/// Socket lifecycle state, numbered like the WebSocket `readyState`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Connecting => write!(f, "CONNECTING"),
            ReadyState::Open => write!(f, "OPEN"),
            ReadyState::Closing => write!(f, "CLOSING"),
            ReadyState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A `ReadyState` shared between a socket handle and its driver task.
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn get(&self) -> ReadyState {
        ReadyState::from(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

// ── Events ───────────────────────────────────────────────────────

/// Why a socket closed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    /// Close code sent by the peer, if a close frame was received.
    pub code: Option<u16>,
    /// Human-readable reason; empty when none was given.
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        Some(self.reason.as_str()).filter(|r| !r.is_empty())
    }
}

/// Notifications from a live socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(WireMessage),
    Close(CloseInfo),
}

// ── Traits ───────────────────────────────────────────────────────

/// Handle to one socket connection.
pub trait Socket: Send + 'static {
    fn ready_state(&self) -> ReadyState;

    /// Queue a message. Fails when the socket is not open.
    fn send(&self, message: WireMessage) -> Result<(), RuttyError>;

    /// Start a graceful close.
    fn close(&self);
}

/// Factory for sockets.
pub trait Connector: Send + 'static {
    type Socket: Socket;

    /// Begin connecting to `endpoint`. Never blocks: the returned socket
    /// starts out `Connecting` and reports progress on the event channel.
    fn connect(&self, endpoint: &Url) -> (Self::Socket, mpsc::UnboundedReceiver<SocketEvent>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_round_trip() {
        for state in [
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closing,
            ReadyState::Closed,
        ] {
            assert_eq!(ReadyState::from(state as u8), state);
        }
        assert_eq!(ReadyState::from(42), ReadyState::Closed);
    }

    #[test]
    fn shared_state_is_shared() {
        let a = SharedReadyState::new(ReadyState::Connecting);
        let b = a.clone();
        b.set(ReadyState::Open);
        assert_eq!(a.get(), ReadyState::Open);
        assert_eq!(a.get().to_string(), "OPEN");
    }

    #[test]
    fn empty_reason_is_none() {
        assert_eq!(CloseInfo::default().reason(), None);
        assert_eq!(CloseInfo::new(Some(1000), "bye").reason(), Some("bye"));
    }
}

//! # rutty-core
//!
//! Client-side transport for the RuTTY web terminal protocol.
//!
//! This crate contains:
//! - **Protocol**: `Frame`, `FrameKind`, `WireMessage`: marker/delimiter framing
//! - **Status**: `ConnectionStatusIndicator`: the user-visible connection state
//! - **Transport**: `TerminalTransport`: connection lifecycle and reconnection
//! - **Network**: `Socket`/`Connector` traits and the WebSocket implementation
//! - **Surface**: `TerminalSurface`: what the transport needs from a terminal
//! - **Subscription**: release handles for listeners and timers
//! - **Error**: `RuttyError`: typed, `thiserror`-based error hierarchy

pub mod config;
pub mod endpoint;
pub mod error;
pub mod network;
pub mod protocol;
pub mod state;
pub mod status;
pub mod subscription;
pub mod surface;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{ConfigSource, Configuration, HttpConfigSource, StaticConfigSource};
pub use endpoint::Origin;
pub use error::{ConfigError, ProtocolError, RuttyError};
pub use network::{CloseInfo, Connector, ReadyState, Socket, SocketEvent, WsConnector, WsSocket};
pub use protocol::{DELIMITER, Frame, FrameKind, InputData, TerminalSize, WireMessage};
pub use state::TransportPhase;
pub use status::{ConnectionStatusIndicator, StatusState, StatusView};
pub use subscription::{Subscription, SubscriptionSet};
pub use surface::{Output, SurfaceEvent, TerminalSurface, Viewport};
pub use transport::{
    ConnectionSession, OPEN_RETRY_DELAY, SessionId, TerminalTransport, TransportHandle,
};

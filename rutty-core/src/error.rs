//! Domain-specific error types for the RuTTY transport.
//!
//! None of these ever escape the transport to its host: they are logged and
//! absorbed into status-indicator state. They exist so that each layer can
//! use `?` and so tests can match on what went wrong.

use thiserror::Error;

/// The canonical error type for the RuTTY transport.
#[derive(Debug, Error)]
pub enum RuttyError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A phase transition was requested from a phase that does not allow it.
    #[error("invalid transition: cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    // ── Connection Errors ────────────────────────────────────────
    /// The origin could not be turned into a socket/config endpoint.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// The socket is not in the open-ready state.
    #[error("socket is not open (state: {0})")]
    NotOpen(crate::network::ReadyState),

    /// The socket's writer is gone.
    #[error("channel closed")]
    ChannelClosed,
}

// ── ProtocolError ─────────────────────────────────────────────────

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message is shorter than marker + delimiter.
    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    /// The leading character does not name a frame kind.
    #[error("unknown frame marker: {0:?}")]
    UnknownMarker(char),

    /// The character after the marker is not the delimiter.
    #[error("missing delimiter after marker {0:?}")]
    MissingDelimiter(char),

    /// A Start/Resize payload is not `rows;cols`.
    #[error("invalid size payload: {0:?}")]
    InvalidSize(String),

    /// Binary messages may only carry Input frames.
    #[error("binary message is not an input frame")]
    UnexpectedBinary,
}

// ── ConfigError ───────────────────────────────────────────────────

/// Typed error for configuration delivery.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The request failed, returned a non-success status, or its body could
    /// not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not a valid configuration object.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RuttyError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RuttyError::ChannelClosed
    }
}

impl From<url::ParseError> for RuttyError {
    fn from(e: url::ParseError) -> Self {
        RuttyError::Endpoint(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = RuttyError::InvalidTransition {
            action: "open",
            phase: "Idle",
        };
        assert_eq!(e.to_string(), "invalid transition: cannot open while Idle");

        let e = ProtocolError::UnknownMarker('9');
        assert!(e.to_string().contains("'9'"));
    }

    #[test]
    fn from_protocol() {
        let e: RuttyError = ProtocolError::TooShort(1).into();
        assert!(matches!(e, RuttyError::Protocol(ProtocolError::TooShort(1))));
    }

    #[test]
    fn from_send_error() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<u8>();
        drop(rx);
        let e: RuttyError = tx.send(1).unwrap_err().into();
        assert!(matches!(e, RuttyError::ChannelClosed));
    }
}

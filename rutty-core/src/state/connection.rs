//! Transport lifecycle state machine.
//!
//! Provides a `TransportPhase` enum that models the lifecycle of a
//! terminal transport, with validated transitions that return `Result`
//! instead of panicking.

use std::time::Instant;

use crate::error::RuttyError;

// ── TransportPhase ───────────────────────────────────────────────

/// The current phase of a terminal transport.
///
/// ```text
///  Idle ──► Connecting ──► Open ──► Closed { reconnect: None }
///               │  ▲
///               │  └──── Closed { reconnect: Some(_) } ◄──┐
///               └─────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransportPhase {
    /// Never activated.
    #[default]
    Idle,

    /// Socket created, waiting for it to open.
    Connecting,

    /// Socket open and Start sent.
    Open {
        /// When the transport entered the `Open` phase.
        since: Instant,
    },

    /// Socket gone. `reconnect_in` is the delay of the scheduled
    /// reconnection, or `None` when the phase is terminal.
    Closed { reconnect_in: Option<u64> },
}

impl std::fmt::Display for TransportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TransportPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Open { .. } => "Open",
            Self::Closed { .. } => "Closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// `true` once closed with nothing scheduled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { reconnect_in: None })
    }

    /// `true` while a reconnection attempt is pending.
    pub fn is_reconnecting(&self) -> bool {
        matches!(self, Self::Closed { reconnect_in: Some(_) })
    }

    /// How long the transport has been open.
    ///
    /// Returns `None` for any other phase.
    pub fn open_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Open { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Idle`, `Closed`.
    pub fn begin_connect(&mut self) -> Result<(), RuttyError> {
        match self {
            Self::Idle | Self::Closed { .. } => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(self.invalid("connect")),
        }
    }

    /// Transition to `Open`.
    ///
    /// Valid from: `Connecting`.
    pub fn open(&mut self) -> Result<(), RuttyError> {
        match self {
            Self::Connecting => {
                *self = Self::Open {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(self.invalid("open")),
        }
    }

    /// Transition to `Closed`.
    ///
    /// Valid from: `Connecting`, `Open`, and a reconnecting `Closed`
    /// (cancelling the pending reconnection).
    pub fn close(&mut self, reconnect_in: Option<u64>) -> Result<(), RuttyError> {
        match self {
            Self::Connecting | Self::Open { .. } | Self::Closed { reconnect_in: Some(_) } => {
                *self = Self::Closed { reconnect_in };
                Ok(())
            }
            _ => Err(self.invalid("close")),
        }
    }

    fn invalid(&self, action: &'static str) -> RuttyError {
        RuttyError::InvalidTransition {
            action,
            phase: self.name(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = TransportPhase::Idle;

        phase.begin_connect().unwrap();
        assert_eq!(phase, TransportPhase::Connecting);

        phase.open().unwrap();
        assert!(phase.is_open());
        assert!(phase.open_duration().is_some());

        phase.close(Some(5)).unwrap();
        assert!(phase.is_reconnecting());
        assert!(!phase.is_terminal());

        phase.begin_connect().unwrap();
        phase.close(None).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn cannot_open_from_idle() {
        let mut phase = TransportPhase::Idle;
        let err = phase.open().unwrap_err();
        assert!(matches!(
            err,
            RuttyError::InvalidTransition {
                action: "open",
                phase: "Idle"
            }
        ));
    }

    #[test]
    fn cannot_connect_while_open() {
        let mut phase = TransportPhase::Open {
            since: Instant::now(),
        };
        assert_err!(phase.begin_connect());
        assert!(phase.is_open());
    }

    #[test]
    fn terminal_close_is_final_for_close() {
        let mut phase = TransportPhase::Closed { reconnect_in: None };
        assert_err!(phase.close(None));
        assert_ok!(phase.begin_connect());
    }

    #[test]
    fn cancel_pending_reconnection() {
        let mut phase = TransportPhase::Closed {
            reconnect_in: Some(3),
        };
        phase.close(None).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn close_while_connecting() {
        let mut phase = TransportPhase::Connecting;
        phase.close(None).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn display_format() {
        assert_eq!(TransportPhase::Idle.to_string(), "Idle");
        assert_eq!(TransportPhase::Connecting.to_string(), "Connecting");
        assert_eq!(
            TransportPhase::Open {
                since: Instant::now()
            }
            .to_string(),
            "Open"
        );
        assert_eq!(
            TransportPhase::Closed { reconnect_in: None }.to_string(),
            "Closed"
        );
    }

    #[test]
    fn default_phase_is_idle() {
        assert_eq!(TransportPhase::default(), TransportPhase::Idle);
    }
}

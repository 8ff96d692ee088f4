//! Terminal transport wire protocol.
//!
//! Outbound traffic is a sequence of marker/delimiter framed messages
//! (see [`frame`]); inbound traffic is unframed raw terminal output and
//! is handed to the surface as-is.

pub mod frame;

pub use frame::{DELIMITER, Frame, FrameKind, InputData, TerminalSize, WireMessage};

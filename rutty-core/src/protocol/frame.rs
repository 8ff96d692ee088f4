//! Marker/delimiter framing for outbound terminal messages.
//!
//! # Wire Protocol
//!
//! ```text
//! Client ──[Start]────► Server   "0;<rows>;<cols>"      (text, once per open)
//! Client ──[Input]────► Server   "1;<text>"             (text)
//! Client ──[Input]────► Server   0x31 0x3B <bytes>      (binary)
//! Client ──[Resize]───► Server   "2;<rows>;<cols>"      (text)
//! Server ──[output]───► Client   raw bytes or text, unframed
//! ```
//!
//! The marker is a single ASCII digit and the delimiter is `;`. Only the
//! first two characters are ever inspected to find the kind; the payload
//! of an Input frame is never re-parsed for the delimiter.

use std::fmt;

use bytes::Bytes;

use crate::error::ProtocolError;

/// Separator between the marker and each payload field.
pub const DELIMITER: char = ';';

// ── FrameKind ────────────────────────────────────────────────────

/// Leading marker naming the frame kind.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Session start, carries the initial size.
    Start = b'0',
    /// Keystrokes or pasted data.
    Input = b'1',
    /// Viewport size change.
    Resize = b'2',
}

impl FrameKind {
    /// The marker character written on the wire.
    pub fn marker(self) -> char {
        self as u8 as char
    }
}

impl TryFrom<char> for FrameKind {
    type Error = ProtocolError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '0' => Ok(FrameKind::Start),
            '1' => Ok(FrameKind::Input),
            '2' => Ok(FrameKind::Resize),
            other => Err(ProtocolError::UnknownMarker(other)),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Start => write!(f, "Start"),
            FrameKind::Input => write!(f, "Input"),
            FrameKind::Resize => write!(f, "Resize"),
        }
    }
}

// ── TerminalSize ─────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

impl TerminalSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Round fractional dimensions (as reported by fitting layouts) to
    /// whole cells, saturating at the `u16` range.
    pub fn from_fractional(rows: f64, cols: f64) -> Self {
        let clamp = |v: f64| v.round().clamp(0.0, u16::MAX as f64) as u16;
        Self {
            rows: clamp(rows),
            cols: clamp(cols),
        }
    }

    fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidSize(payload.to_string());
        let (rows, cols) = payload.split_once(DELIMITER).ok_or_else(invalid)?;
        Ok(Self {
            rows: rows.parse().map_err(|_| invalid())?,
            cols: cols.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

// ── WireMessage ──────────────────────────────────────────────────

/// One socket message, in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Bytes),
}

// ── Frame ────────────────────────────────────────────────────────

/// Payload of an Input frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputData {
    /// Text input, sent as a text message.
    Text(String),
    /// Byte-range input, sent as a binary message.
    Binary(Bytes),
}

impl InputData {
    /// Build binary input from a string whose characters are byte values
    /// (as terminal emulators report non-UTF-8 input). Only the low eight
    /// bits of each character are kept.
    pub fn from_byte_string(data: &str) -> Self {
        InputData::Binary(data.chars().map(|c| (c as u32 & 0xff) as u8).collect())
    }
}

/// A logical outbound protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Start(TerminalSize),
    Input(InputData),
    Resize(TerminalSize),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Start(_) => FrameKind::Start,
            Frame::Input(_) => FrameKind::Input,
            Frame::Resize(_) => FrameKind::Resize,
        }
    }

    /// Encode into the socket message carrying this frame.
    pub fn encode(&self) -> WireMessage {
        let marker = self.kind().marker();
        match self {
            Frame::Start(size) | Frame::Resize(size) => WireMessage::Text(format!(
                "{marker}{DELIMITER}{}{DELIMITER}{}",
                size.rows, size.cols
            )),
            Frame::Input(InputData::Text(text)) => {
                let mut out = String::with_capacity(text.len() + 2);
                out.push(marker);
                out.push(DELIMITER);
                out.push_str(text);
                WireMessage::Text(out)
            }
            Frame::Input(InputData::Binary(data)) => {
                let mut out = Vec::with_capacity(data.len() + 2);
                out.push(marker as u8);
                out.push(DELIMITER as u8);
                out.extend_from_slice(data);
                WireMessage::Binary(Bytes::from(out))
            }
        }
    }

    /// Decode a message produced by [`Frame::encode`].
    pub fn decode(message: &WireMessage) -> Result<Self, ProtocolError> {
        match message {
            WireMessage::Text(text) => Self::decode_text(text),
            WireMessage::Binary(data) => {
                if data.len() < 2 {
                    return Err(ProtocolError::TooShort(data.len()));
                }
                if data[0] != FrameKind::Input as u8 {
                    return Err(ProtocolError::UnexpectedBinary);
                }
                if data[1] != DELIMITER as u8 {
                    return Err(ProtocolError::MissingDelimiter(data[0] as char));
                }
                Ok(Frame::Input(InputData::Binary(data.slice(2..))))
            }
        }
    }

    fn decode_text(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let (Some(marker), Some(delimiter)) = (chars.next(), chars.next()) else {
            return Err(ProtocolError::TooShort(text.len()));
        };
        let kind = FrameKind::try_from(marker)?;
        if delimiter != DELIMITER {
            return Err(ProtocolError::MissingDelimiter(marker));
        }
        // Marker and delimiter are both ASCII.
        let payload = &text[2..];
        Ok(match kind {
            FrameKind::Start => Frame::Start(TerminalSize::parse(payload)?),
            FrameKind::Resize => Frame::Resize(TerminalSize::parse(payload)?),
            FrameKind::Input => Frame::Input(InputData::Text(payload.to_string())),
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Start(size) => write!(f, "Start({size})"),
            Frame::Resize(size) => write!(f, "Resize({size})"),
            Frame::Input(InputData::Text(t)) => write!(f, "Input({} chars)", t.chars().count()),
            Frame::Input(InputData::Binary(b)) => write!(f, "Input({} bytes)", b.len()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

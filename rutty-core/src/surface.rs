//! Capability interface of the terminal surface the transport drives.
//!
//! The transport never renders anything itself: it writes remote output
//! to a [`TerminalSurface`] and listens to the surface's input events.
//! Host-wide window resizes arrive separately through a [`Viewport`].

use tokio::sync::broadcast;

use crate::protocol::TerminalSize;

const EVENT_CAPACITY: usize = 256;

/// Output handed to the surface for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// Events raised by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Text typed or pasted by the user.
    Data(String),
    /// Byte-range input encoded one character per byte.
    Binary(String),
    /// The surface changed its row/column count.
    Resize(TerminalSize),
}

/// What the transport needs from a terminal.
pub trait TerminalSurface: Send + 'static {
    fn clear(&mut self);
    fn focus(&mut self);
    fn blur(&mut self);
    fn write(&mut self, data: Output<'_>);
    fn rows(&self) -> u16;
    fn cols(&self) -> u16;

    /// A fresh receiver of input and resize events.
    fn events(&self) -> broadcast::Receiver<SurfaceEvent>;

    fn size(&self) -> TerminalSize {
        TerminalSize::new(self.rows(), self.cols())
    }

    /// Apply a title delivered by the server configuration.
    fn set_title(&mut self, _title: &str) {}
}

/// Helper for surface implementations: a broadcast channel sized for
/// interactive input.
pub fn event_channel() -> broadcast::Sender<SurfaceEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}

// ── Viewport ─────────────────────────────────────────────────────

/// Host-wide "the viewport was resized" notifications.
#[derive(Debug, Clone)]
pub struct Viewport {
    tx: broadcast::Sender<()>,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(16).0,
        }
    }

    pub fn notify_resized(&self) {
        // No receivers simply means no transport is listening right now.
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

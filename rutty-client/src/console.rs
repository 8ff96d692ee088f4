//! Terminal surface backed by the local console.
//!
//! Remote output is written straight to stdout; the console emulator does
//! the rendering. Key presses and window resizes are read by a dedicated
//! blocking thread polling crossterm and published as [`SurfaceEvent`]s.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::{cursor, execute, terminal};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use rutty_core::surface::event_channel;
use rutty_core::{Output, SurfaceEvent, TerminalSize, TerminalSurface, TransportHandle};

use crate::keys::{KeyInput, translate_key};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// State shared with the input thread.
struct Shared {
    size: Mutex<TerminalSize>,
    focused: AtomicBool,
    running: AtomicBool,
}

impl Shared {
    fn size(&self) -> TerminalSize {
        self.size.lock().map(|s| *s).unwrap_or_default()
    }
}

/// The local console as a [`TerminalSurface`].
pub struct ConsoleSurface {
    shared: Arc<Shared>,
    events: broadcast::Sender<SurfaceEvent>,
}

impl ConsoleSurface {
    /// Start reading console input. Ctrl-] asks `transport` to dispose.
    pub fn new(transport: TransportHandle) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        let shared = Arc::new(Shared {
            size: Mutex::new(TerminalSize::new(rows, cols)),
            focused: AtomicBool::new(false),
            running: AtomicBool::new(true),
        });
        let events = event_channel();

        let input_shared = Arc::clone(&shared);
        let input_events = events.clone();
        tokio::task::spawn_blocking(move || input_loop(input_shared, input_events, transport));

        Ok(Self { shared, events })
    }
}

fn input_loop(
    shared: Arc<Shared>,
    events: broadcast::Sender<SurfaceEvent>,
    transport: TransportHandle,
) {
    while shared.running.load(Ordering::SeqCst) {
        if !event::poll(POLL_INTERVAL).unwrap_or(false) {
            continue;
        }
        let event = match event::read() {
            Ok(event) => event,
            Err(e) => {
                warn!("console input failed: {e}");
                break;
            }
        };
        match event {
            Event::Key(key) => match translate_key(&key) {
                Some(KeyInput::Detach) => {
                    debug!("detach key pressed");
                    transport.dispose();
                    break;
                }
                Some(KeyInput::Data(data)) if shared.focused.load(Ordering::SeqCst) => {
                    // Nobody listening just means no session is active.
                    let _ = events.send(SurfaceEvent::Data(data));
                }
                _ => {}
            },
            Event::Paste(text) if shared.focused.load(Ordering::SeqCst) => {
                let _ = events.send(SurfaceEvent::Data(text));
            }
            Event::Resize(cols, rows) => {
                let size = TerminalSize::new(rows, cols);
                if let Ok(mut current) = shared.size.lock() {
                    *current = size;
                }
                let _ = events.send(SurfaceEvent::Resize(size));
            }
            _ => {}
        }
    }
}

impl TerminalSurface for ConsoleSurface {
    fn clear(&mut self) {
        if let Err(e) = execute!(
            io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        ) {
            warn!("failed to clear console: {e}");
        }
    }

    fn focus(&mut self) {
        self.shared.focused.store(true, Ordering::SeqCst);
        let _ = execute!(io::stdout(), cursor::Show);
    }

    fn blur(&mut self) {
        self.shared.focused.store(false, Ordering::SeqCst);
    }

    fn write(&mut self, data: Output<'_>) {
        let bytes = match data {
            Output::Text(text) => text.as_bytes(),
            Output::Bytes(bytes) => bytes,
        };
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(bytes).and_then(|()| out.flush()) {
            warn!("failed to write to console: {e}");
        }
    }

    fn rows(&self) -> u16 {
        self.shared.size().rows
    }

    fn cols(&self) -> u16 {
        self.shared.size().cols
    }

    fn events(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }

    fn set_title(&mut self, title: &str) {
        if let Err(e) = execute!(io::stdout(), terminal::SetTitle(title)) {
            warn!("failed to set title: {e}");
        }
    }
}

impl Drop for ConsoleSurface {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

//! Terminal transport: binds a [`TerminalSurface`] to a remote process over
//! one socket, and brings the connection back after it drops.
//!
//! All state is owned by [`TerminalTransport`] and changed only while it
//! handles an event. Socket events, surface events, viewport resizes,
//! timers and configuration results are all forwarded into one channel by
//! small helper tasks; each helper belongs to the current
//! [`ConnectionSession`] as a [`Subscription`] and is aborted when the
//! session is torn down.
//!
//! ```text
//!  Idle ──activate──► Connecting ──open──► Open ──close──► Closed
//!                         ▲                                   │
//!                         └────────── reconnect timer ◄───────┘
//! ```

mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ConfigSource, Configuration, HttpConfigSource};
use crate::endpoint::Origin;
use crate::error::ConfigError;
use crate::network::{Connector, ReadyState, SocketEvent};
use crate::protocol::{Frame, InputData, WireMessage};
use crate::state::TransportPhase;
use crate::status::ConnectionStatusIndicator;
use crate::subscription::Subscription;
use crate::surface::{Output, SurfaceEvent, TerminalSurface, Viewport};

pub use session::{ConnectionSession, SessionId};

/// Delay before re-checking a socket that reported open too early.
pub const OPEN_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
enum TransportEvent {
    Socket {
        session: SessionId,
        event: SocketEvent,
    },
    Surface {
        session: SessionId,
        event: SurfaceEvent,
    },
    ViewportResized {
        session: SessionId,
    },
    OpenRetry {
        session: SessionId,
    },
    ReconnectDue,
    Configured(Result<Configuration, ConfigError>),
    Dispose,
}

/// Cloneable handle for requesting teardown from outside the event loop.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportHandle {
    /// Ask the transport to dispose itself. No-op once it is gone.
    pub fn dispose(&self) {
        let _ = self.tx.send(TransportEvent::Dispose);
    }
}

/// The connection/protocol manager and its reconnection state machine.
pub struct TerminalTransport<C: Connector, S: TerminalSurface> {
    status: ConnectionStatusIndicator,
    connector: C,
    endpoint: Url,
    config_source: Arc<dyn ConfigSource>,
    viewport: Option<Viewport>,

    phase: TransportPhase,
    surface: Option<S>,
    session: Option<ConnectionSession<C::Socket>>,
    last_session: SessionId,
    /// Reconnection delay in seconds; `None` disables reconnection.
    reconnect: Option<u64>,
    pending_reconnect: Option<Subscription>,

    tx: mpsc::UnboundedSender<TransportEvent>,
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<C: Connector, S: TerminalSurface> TerminalTransport<C, S> {
    /// Create a transport for the server at `origin`, fetching its
    /// configuration over HTTP.
    pub fn new(status: ConnectionStatusIndicator, connector: C, origin: &Origin) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            status,
            connector,
            endpoint: origin.socket_endpoint(),
            config_source: Arc::new(HttpConfigSource::new(origin)),
            viewport: None,
            phase: TransportPhase::Idle,
            surface: None,
            session: None,
            last_session: 0,
            reconnect: None,
            pending_reconnect: None,
            tx,
            rx,
        }
    }

    /// Replace where configuration is fetched from.
    pub fn with_config_source(mut self, source: impl ConfigSource) -> Self {
        self.config_source = Arc::new(source);
        self
    }

    /// Also send Resize frames on host-wide viewport resizes.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Initial reconnection delay, used until a configuration arrives.
    pub fn with_reconnect(mut self, seconds: Option<u64>) -> Self {
        self.reconnect = seconds;
        self
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn phase(&self) -> &TransportPhase {
        &self.phase
    }

    pub fn status(&self) -> &ConnectionStatusIndicator {
        &self.status
    }

    pub fn session(&self) -> Option<&ConnectionSession<C::Socket>> {
        self.session.as_ref()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn reconnect_interval(&self) -> Option<u64> {
        self.reconnect
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.pending_reconnect.is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Bind `surface` and open a new session.
    pub fn activate(&mut self, surface: S) {
        self.surface = Some(surface);
        self.start_session();
    }

    /// Tear everything down deliberately. Never schedules reconnection.
    pub fn dispose(&mut self) {
        let cancelled = self.pending_reconnect.take().is_some();
        if cancelled {
            info!("pending reconnection cancelled");
        }
        if matches!(self.phase, TransportPhase::Idle) || (self.phase.is_terminal() && !cancelled) {
            debug!("dispose: nothing to tear down");
            return;
        }
        self.teardown(None, None);
        info!("transport disposed");
    }

    /// Wait for the next event and handle it.
    pub async fn step(&mut self) {
        if let Some(event) = self.rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Handle events until the transport closes with nothing scheduled.
    pub async fn run(&mut self) {
        while !self.phase.is_terminal() {
            self.step().await;
        }
    }

    fn start_session(&mut self) {
        if let Some(previous) = self.session.take() {
            debug!(session = previous.id(), "superseding live session");
            previous.teardown();
            let _ = self.phase.close(None);
        }
        if let Some(mut pending) = self.pending_reconnect.take() {
            pending.dispose();
        }
        let Some(surface) = self.surface.as_mut() else {
            warn!("activation without a surface");
            return;
        };
        surface.clear();
        surface.focus();
        let surface_events = surface.events();

        self.status.set_connecting();
        if let Err(e) = self.phase.begin_connect() {
            warn!("{e}");
        }

        self.last_session += 1;
        let id = self.last_session;
        info!(session = id, "connecting to {}", self.endpoint);
        let (socket, socket_events) = self.connector.connect(&self.endpoint);
        let mut session = ConnectionSession::new(id, socket);

        self.configure();

        session.subscribe(Subscription::spawn(
            "socket",
            forward_socket(id, socket_events, self.tx.clone()),
        ));
        session.subscribe(Subscription::spawn(
            "surface",
            forward_broadcast(surface_events, self.tx.clone(), move |event| {
                TransportEvent::Surface { session: id, event }
            }),
        ));
        if let Some(viewport) = &self.viewport {
            session.subscribe(Subscription::spawn(
                "viewport",
                forward_broadcast(viewport.subscribe(), self.tx.clone(), move |()| {
                    TransportEvent::ViewportResized { session: id }
                }),
            ));
        }
        self.session = Some(session);

        // Dropped by the send guard unless the socket is already open.
        self.send_resize();
    }

    fn configure(&self) {
        let source = Arc::clone(&self.config_source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.fetch().await;
            let _ = tx.send(TransportEvent::Configured(result));
        });
    }

    // ── Event handling ───────────────────────────────────────────

    fn is_current(&self, session: SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id() == session)
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Socket { session, event } if self.is_current(session) => match event {
                SocketEvent::Open => self.on_open(),
                SocketEvent::Message(message) => self.on_message(message),
                SocketEvent::Close(close) => self.on_close(close.reason()),
            },
            TransportEvent::Surface { session, event } if self.is_current(session) => match event {
                SurfaceEvent::Data(text) => self.send_started(Frame::Input(InputData::Text(text))),
                SurfaceEvent::Binary(data) => {
                    self.send_started(Frame::Input(InputData::from_byte_string(&data)))
                }
                SurfaceEvent::Resize(size) => self.send_started(Frame::Resize(size)),
            },
            TransportEvent::ViewportResized { session } if self.is_current(session) => {
                if let Some(size) = self.surface.as_ref().map(|s| s.size()) {
                    self.send_started(Frame::Resize(size));
                }
            }
            TransportEvent::OpenRetry { session } if self.is_current(session) => self.on_open(),
            TransportEvent::ReconnectDue => self.on_reconnect_due(),
            TransportEvent::Configured(result) => self.apply_configuration(result),
            TransportEvent::Dispose => self.dispose(),
            stale => debug!("ignoring event from a superseded session: {stale:?}"),
        }
    }

    fn on_open(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let state = session.ready_state();
        if state != ReadyState::Open {
            warn!(
                session = session.id(),
                "socket state is {state}, checking again in {OPEN_RETRY_DELAY:?}"
            );
            let id = session.id();
            let tx = self.tx.clone();
            session.retry_open(Subscription::timeout("open-retry", OPEN_RETRY_DELAY, move || {
                let _ = tx.send(TransportEvent::OpenRetry { session: id });
            }));
            return;
        }
        if let Err(e) = self.phase.open() {
            warn!("{e}");
            return;
        }
        self.status.set_connected();
        let size = self.surface.as_ref().map(|s| s.size()).unwrap_or_default();
        info!(session = session.id(), "connected, starting at {size}");
        self.send(Frame::Start(size));
    }

    fn on_message(&mut self, message: WireMessage) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match &message {
            WireMessage::Text(text) => surface.write(Output::Text(text)),
            WireMessage::Binary(data) => surface.write(Output::Bytes(data)),
        }
    }

    fn on_close(&mut self, reason: Option<&str>) {
        let reconnect = self.reconnect;
        self.teardown(reason, reconnect);
    }

    /// Shared by socket closure and [`dispose`](Self::dispose).
    fn teardown(&mut self, reason: Option<&str>, reconnect: Option<u64>) {
        self.status.set_disconnected(reason, reconnect);
        if let Some(surface) = self.surface.as_mut() {
            surface.blur();
        }
        if let Some(session) = self.session.take() {
            info!(session = session.id(), reason = reason.unwrap_or(""), "session closed");
            session.teardown();
        }
        if let Some(uptime) = self.phase.open_duration() {
            info!("connection was open for {uptime:?}");
        }
        if let Err(e) = self.phase.close(reconnect) {
            debug!("{e}");
        }

        if let Some(seconds) = reconnect {
            info!("reconnecting in {seconds}s");
            let tx = self.tx.clone();
            self.pending_reconnect = Some(Subscription::timeout(
                "reconnect",
                Duration::from_secs(seconds),
                move || {
                    let _ = tx.send(TransportEvent::ReconnectDue);
                },
            ));
        }
    }

    fn on_reconnect_due(&mut self) {
        if self.pending_reconnect.take().is_none() || !self.phase.is_reconnecting() {
            debug!("ignoring stale reconnection timer");
            return;
        }
        // One attempt per configured interval; a fresh configuration may
        // enable the next one.
        self.reconnect = None;
        info!("reconnecting");
        self.start_session();
    }

    fn apply_configuration(&mut self, result: Result<Configuration, ConfigError>) {
        let config = match result {
            Ok(config) => config,
            Err(e) => {
                warn!("failed to read configuration: {e}");
                return;
            }
        };
        debug!(?config, "configuration received");
        self.reconnect = config.reconnect_interval();
        if let (Some(title), Some(surface)) = (&config.title, self.surface.as_mut()) {
            surface.set_title(title);
        }
    }

    // ── Outbound ─────────────────────────────────────────────────

    fn send_resize(&self) {
        if let Some(surface) = &self.surface {
            self.send(Frame::Resize(surface.size()));
        }
    }

    /// Send a frame that must follow Start. The socket may already report
    /// open while its open event is still queued; until that event has
    /// been handled and Start sent, the frame is dropped.
    fn send_started(&self, frame: Frame) {
        if !self.phase.is_open() {
            debug!("session not started, dropping {frame}");
            return;
        }
        self.send(frame);
    }

    fn send(&self, frame: Frame) {
        match &self.session {
            Some(session) => {
                session.send(&frame);
            }
            None => debug!("no session, dropping {frame}"),
        }
    }
}

async fn forward_socket(
    session: SessionId,
    mut events: mpsc::UnboundedReceiver<SocketEvent>,
    tx: mpsc::UnboundedSender<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        if tx.send(TransportEvent::Socket { session, event }).is_err() {
            break;
        }
    }
}

async fn forward_broadcast<T, F>(
    mut events: broadcast::Receiver<T>,
    tx: mpsc::UnboundedSender<TransportEvent>,
    wrap: F,
) where
    T: Clone + Send + 'static,
    F: Fn(T) -> TransportEvent + Send + 'static,
{
    loop {
        match events.recv().await {
            Ok(event) => {
                if tx.send(wrap(event)).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("dropped {n} events"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
